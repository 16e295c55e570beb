use embedded_graphics::{
    prelude::{DrawTarget, OriginDimensions, PixelColor, Point, Size},
    primitives::Rectangle,
    transform::Transform,
    Pixel,
};

/// A window into a larger draw target.
///
/// Coordinates are relative to the window's top left corner and anything drawn
/// outside of the window is dropped, so a sub canvas can never write into a
/// neighbouring region of the parent canvas.
pub struct SubCanvas<'a, D> {
    offset: Point,
    size: Size,
    canvas: &'a mut D,
}

impl<'a, D> SubCanvas<'a, D> {
    pub fn new(area: Rectangle, canvas: &'a mut D) -> Self {
        SubCanvas {
            offset: area.top_left,
            size: area.size,
            canvas,
        }
    }

    fn local_bounds(&self) -> Rectangle {
        Rectangle::new(Point::zero(), self.size)
    }
}

impl<D> OriginDimensions for SubCanvas<'_, D> {
    fn size(&self) -> Size {
        self.size
    }
}

impl<D, C> DrawTarget for SubCanvas<'_, D>
where
    C: PixelColor,
    D: DrawTarget<Color = C>,
{
    type Color = C;
    type Error = D::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds = self.local_bounds();
        let offset = self.offset;

        let translated_pixels = pixels
            .into_iter()
            .filter(|Pixel(point, _)| bounds.contains(*point))
            .map(|Pixel(point, color)| Pixel(offset + point, color));

        self.canvas.draw_iter(translated_pixels)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.local_bounds());
        if clipped.size == Size::zero() {
            return Ok(());
        }

        self.canvas.fill_solid(&clipped.translate(self.offset), color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let translated_bounds = Rectangle {
            top_left: self.offset,
            size: self.size,
        };

        self.canvas.fill_solid(&translated_bounds, color)
    }
}
