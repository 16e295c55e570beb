use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Point, Size},
    primitives::Rectangle,
    Pixel,
};
use std::convert::Infallible;

/// An owned 1-bit pixel buffer.
///
/// `BinaryColor::On` is ink (black on the black plane, the accent colour on the
/// accent plane) and `BinaryColor::Off` is paper. Drawing outside of the frame is
/// silently clipped, which is what keeps module output inside its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    size: Size,
    pixels: Box<[BinaryColor]>,
}

impl Frame {
    pub fn new(size: Size) -> Frame {
        Self::filled(size, BinaryColor::Off)
    }

    pub fn filled(size: Size, color: BinaryColor) -> Frame {
        let num_of_pixels = size.width as usize * size.height as usize;

        Self {
            size,
            pixels: vec![color; num_of_pixels].into_boxed_slice(),
        }
    }

    fn convert_point_to_offset(&self, point: Point) -> Option<usize> {
        if point.x < 0 || point.y < 0 {
            return None;
        }

        let (x, y) = (point.x as u32, point.y as u32);
        if x < self.size.width && y < self.size.height {
            Some((x + y * self.size.width) as usize)
        } else {
            None
        }
    }

    pub fn pixel(&self, point: Point) -> Option<BinaryColor> {
        self.convert_point_to_offset(point)
            .map(|offset| self.pixels[offset])
    }

    pub fn set_pixel(&mut self, point: Point, color: BinaryColor) {
        if let Some(offset) = self.convert_point_to_offset(point) {
            self.pixels[offset] = color;
        }
    }

    /// Rows of pixels, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[BinaryColor]> {
        self.pixels.chunks(self.size.width.max(1) as usize)
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|color| color.is_off())
    }

    pub fn ink_count(&self) -> usize {
        self.pixels.iter().filter(|color| color.is_on()).count()
    }

    /// Copies the `area` of this frame into a new frame of the same size as `area`.
    ///
    /// Parts of `area` that fall outside of this frame come back as paper.
    pub fn crop(&self, area: &Rectangle) -> Frame {
        let mut cropped = Frame::new(area.size);

        for y in 0..area.size.height as i32 {
            for x in 0..area.size.width as i32 {
                let source = area.top_left + Point::new(x, y);
                if let Some(color) = self.pixel(source) {
                    cropped.set_pixel(Point::new(x, y), color);
                }
            }
        }

        cropped
    }

    /// Ink from `other` is added to this frame, paper in `other` leaves this frame
    /// untouched. Both frames must share the same size.
    pub fn merge_ink(&mut self, other: &Frame) {
        debug_assert_eq!(self.size, other.size);

        for (pixel, other) in self.pixels.iter_mut().zip(other.pixels.iter()) {
            if other.is_on() {
                *pixel = BinaryColor::On;
            }
        }
    }

    /// Rotates the frame by 90° clockwise, swapping width and height.
    pub fn rotate_cw(&self) -> Frame {
        let Size { width, height } = self.size;
        let mut rotated = Frame::new(Size::new(height, width));

        for y in 0..height as i32 {
            for x in 0..width as i32 {
                if let Some(color) = self.pixel(Point::new(x, y)) {
                    rotated.set_pixel(Point::new(height as i32 - 1 - y, x), color);
                }
            }
        }

        rotated
    }

    pub fn rotate_180(&self) -> Frame {
        let mut pixels = self.pixels.clone();
        pixels.reverse();

        Self {
            size: self.size,
            pixels,
        }
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels.into_iter() {
            if let Some(index) = self.convert_point_to_offset(point) {
                self.pixels[index] = color;
            }
        }

        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.pixels.iter_mut().for_each(|pixel| *pixel = color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::{
        prelude::Primitive,
        primitives::{Line, PrimitiveStyle},
        Drawable,
    };

    #[test]
    fn drawing_outside_the_frame_is_clipped() {
        let mut frame = Frame::new(Size::new(4, 4));

        Line::new(Point::new(-2, 1), Point::new(10, 1))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut frame)
            .unwrap();

        assert_eq!(frame.ink_count(), 4);
        assert_eq!(frame.pixel(Point::new(0, 1)), Some(BinaryColor::On));
        assert_eq!(frame.pixel(Point::new(4, 1)), None);
    }

    #[test]
    fn crop_copies_the_requested_area() {
        let mut frame = Frame::new(Size::new(6, 6));
        frame.set_pixel(Point::new(3, 4), BinaryColor::On);

        let cropped = frame.crop(&Rectangle::new(Point::new(2, 2), Size::new(3, 3)));

        assert_eq!(cropped.size(), Size::new(3, 3));
        assert_eq!(cropped.pixel(Point::new(1, 2)), Some(BinaryColor::On));
        assert_eq!(cropped.ink_count(), 1);
    }

    #[test]
    fn rotate_clockwise_moves_top_left_to_top_right() {
        let mut frame = Frame::new(Size::new(3, 2));
        frame.set_pixel(Point::new(0, 0), BinaryColor::On);

        let rotated = frame.rotate_cw();

        assert_eq!(rotated.size(), Size::new(2, 3));
        assert_eq!(rotated.pixel(Point::new(1, 0)), Some(BinaryColor::On));
        assert_eq!(rotated.ink_count(), 1);
    }

    #[test]
    fn rotate_180_twice_is_identity() {
        let mut frame = Frame::new(Size::new(5, 3));
        frame.set_pixel(Point::new(1, 2), BinaryColor::On);
        frame.set_pixel(Point::new(4, 0), BinaryColor::On);

        assert_eq!(frame.rotate_180().pixel(Point::new(3, 0)), Some(BinaryColor::On));
        assert_eq!(frame.rotate_180().rotate_180(), frame);
    }

    #[test]
    fn merge_ink_keeps_existing_ink() {
        let mut black = Frame::new(Size::new(2, 1));
        black.set_pixel(Point::new(0, 0), BinaryColor::On);
        let mut accent = Frame::new(Size::new(2, 1));
        accent.set_pixel(Point::new(1, 0), BinaryColor::On);

        black.merge_ink(&accent);

        assert_eq!(black.ink_count(), 2);
    }
}
