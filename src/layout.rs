use crate::config::{ConfigError, SectionContent};
use embedded_graphics::{
    prelude::{Point, Size},
    primitives::Rectangle,
};
use std::str::FromStr;
use strum_macros::AsRefStr;

/// The three full width bands of the screen, in paste order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    Top,
    Middle,
    Bottom,
}

/// A fixed rectangle of the canvas owned by one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub section: Section,
    pub area: Rectangle,
}

impl Region {
    pub fn new(section: Section, area: Rectangle) -> Self {
        Self { section, area }
    }

    pub fn name(&self) -> &'static str {
        match self.section {
            Section::Top => "top",
            Section::Middle => "middle",
            Section::Bottom => "bottom",
        }
    }

    pub fn size(&self) -> Size {
        self.area.size
    }
}

/// A region together with the content configured for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub region: Region,

    /// `None` leaves the region blank
    pub content: Option<SectionContent>,
}

/// Band heights used when the configuration does not override them, as
/// percentages of the canvas height. The bottom band takes the remainder.
const TOP_PERCENT: u32 = 10;
const MIDDLE_PERCENT: u32 = 65;

/// Computes the placement of every section on a canvas of `canvas` size.
///
/// `contents` holds the configured renderer name of the top, middle and bottom
/// section in that order. The result is ordered top to bottom.
pub fn compute(
    canvas: Size,
    section_heights: Option<[u32; 3]>,
    contents: [Option<&str>; 3],
) -> Result<Vec<Placement>, ConfigError> {
    let heights = section_heights.unwrap_or_else(|| default_heights(canvas.height));
    let sections = [Section::Top, Section::Middle, Section::Bottom];

    let mut placements = Vec::with_capacity(sections.len());
    let mut y: i64 = 0;

    for ((section, height), name) in sections.into_iter().zip(heights).zip(contents) {
        let content = match name {
            Some(name) => Some(SectionContent::from_str(name.trim()).map_err(|_| {
                ConfigError::UnknownRenderer {
                    section,
                    name: name.to_owned(),
                }
            })?),
            None => None,
        };

        if y + height as i64 > canvas.height as i64 {
            return Err(ConfigError::RegionOutOfBounds(section));
        }

        let region = Region::new(
            section,
            Rectangle::new(Point::new(0, y as i32), Size::new(canvas.width, height)),
        );
        y += height as i64;

        placements.push(Placement { region, content });
    }

    let regions = placements
        .iter()
        .map(|placement| placement.region)
        .collect::<Vec<_>>();
    validate(canvas, &regions)?;

    Ok(placements)
}

fn default_heights(canvas_height: u32) -> [u32; 3] {
    let top = canvas_height * TOP_PERCENT / 100;
    let middle = canvas_height * MIDDLE_PERCENT / 100;

    [top, middle, canvas_height - top - middle]
}

/// Checks that every region lies inside the canvas and that no two regions share
/// a pixel.
pub fn validate(canvas: Size, regions: &[Region]) -> Result<(), ConfigError> {
    let canvas_area = Rectangle::new(Point::zero(), canvas);

    for region in regions {
        if region.area.size != Size::zero()
            && canvas_area.intersection(&region.area) != region.area
        {
            return Err(ConfigError::RegionOutOfBounds(region.section));
        }
    }

    for (index, first) in regions.iter().enumerate() {
        for second in &regions[index + 1..] {
            if overlaps(&first.area, &second.area) {
                return Err(ConfigError::RegionOverlap(first.section, second.section));
            }
        }
    }

    Ok(())
}

fn overlaps(first: &Rectangle, second: &Rectangle) -> bool {
    let intersection = first.intersection(second);
    intersection.size.width > 0 && intersection.size.height > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_split_follows_band_percentages() {
        let placements = compute(
            Size::new(384, 640),
            None,
            [Some("weather"), Some("Calendar"), Some("RSS")],
        )
        .unwrap();

        let heights = placements
            .iter()
            .map(|placement| placement.region.size().height)
            .collect::<Vec<_>>();
        assert_eq!(heights, vec![64, 416, 160]);
        assert_eq!(placements[1].region.area.top_left, Point::new(0, 64));
        assert_eq!(placements[2].region.area.top_left, Point::new(0, 480));
        assert_eq!(placements[0].content, Some(SectionContent::Weather));
        assert_eq!(placements[2].content, Some(SectionContent::Rss));
    }

    #[test]
    fn unassigned_section_keeps_its_region() {
        let placements = compute(Size::new(100, 100), None, [None, Some("agenda"), None]).unwrap();

        assert_eq!(placements.len(), 3);
        assert_eq!(placements[0].content, None);
        assert_eq!(placements[1].content, Some(SectionContent::Agenda));
    }

    #[test]
    fn unknown_renderer_is_rejected() {
        let error = compute(Size::new(100, 100), None, [Some("stocks"), None, None]).unwrap_err();

        assert!(matches!(
            error,
            ConfigError::UnknownRenderer {
                section: Section::Top,
                ..
            }
        ));
    }

    #[test]
    fn custom_heights_past_the_canvas_are_rejected() {
        let error = compute(Size::new(100, 100), Some([40, 40, 40]), [None, None, None]).unwrap_err();

        assert!(matches!(error, ConfigError::RegionOutOfBounds(Section::Bottom)));
    }

    #[test]
    fn overlapping_regions_are_detected() {
        let regions = [
            Region::new(
                Section::Top,
                Rectangle::new(Point::zero(), Size::new(10, 10)),
            ),
            Region::new(
                Section::Middle,
                Rectangle::new(Point::new(0, 9), Size::new(10, 10)),
            ),
        ];

        assert!(matches!(
            validate(Size::new(10, 30), &regions),
            Err(ConfigError::RegionOverlap(Section::Top, Section::Middle))
        ));
    }

    #[test]
    fn touching_regions_do_not_overlap() {
        let regions = [
            Region::new(
                Section::Top,
                Rectangle::new(Point::zero(), Size::new(10, 10)),
            ),
            Region::new(
                Section::Middle,
                Rectangle::new(Point::new(0, 10), Size::new(10, 10)),
            ),
        ];

        assert!(validate(Size::new(10, 20), &regions).is_ok());
    }

    proptest! {
        #[test]
        fn computed_regions_partition_inside_the_canvas(
            width in 1u32..2000,
            height in 0u32..2000,
            top in 0u32..700,
            middle in 0u32..700,
            bottom in 0u32..700,
            custom in any::<bool>(),
        ) {
            let canvas = Size::new(width, height);
            let heights = custom.then_some([top, middle, bottom]);

            match compute(canvas, heights, [None, None, None]) {
                Ok(placements) => {
                    let regions = placements.iter().map(|p| p.region).collect::<Vec<_>>();
                    prop_assert!(validate(canvas, &regions).is_ok());

                    let covered: u32 = regions.iter().map(|r| r.size().height).sum();
                    prop_assert!(covered <= height);
                    if !custom {
                        prop_assert_eq!(covered, height);
                    }
                }
                Err(error) => {
                    prop_assert!(custom);
                    prop_assert!(top + middle + bottom > height, "{}", error);
                }
            }
        }
    }
}
