//! Bringing two captures to a common size before comparison

use image::imageops::{self, FilterType};
use image::RgbaImage;
use std::borrow::Cow;

/// Scale the smaller image (by pixel count) to the larger one's dimensions
/// using nearest-neighbour sampling. Equal sizes pass through untouched.
pub fn match_dimensions<'a>(a: &'a RgbaImage, b: &'a RgbaImage) -> (Cow<'a, RgbaImage>, Cow<'a, RgbaImage>) {
    if a.dimensions() == b.dimensions() {
        return (Cow::Borrowed(a), Cow::Borrowed(b));
    }
    let area = |img: &RgbaImage| img.width() as u64 * img.height() as u64;
    if area(a) < area(b) {
        let scaled = imageops::resize(a, b.width(), b.height(), FilterType::Nearest);
        (Cow::Owned(scaled), Cow::Borrowed(b))
    } else {
        let scaled = imageops::resize(b, a.width(), a.height(), FilterType::Nearest);
        (Cow::Borrowed(a), Cow::Owned(scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn split(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn smaller_image_is_upscaled_without_smoothing() {
        let small = split(4, 2);
        let large = split(8, 4);
        let (a, b) = match_dimensions(&small, &large);
        assert!(matches!(a, Cow::Owned(_)));
        assert!(matches!(b, Cow::Borrowed(_)));
        assert_eq!(a.dimensions(), (8, 4));
        assert_eq!(*a, *b);
    }

    #[test]
    fn order_of_arguments_does_not_matter() {
        let small = split(4, 2);
        let large = split(8, 4);
        let (a, b) = match_dimensions(&large, &small);
        assert_eq!(b.dimensions(), (8, 4));
        assert_eq!(*a, *b);
    }

    #[test]
    fn equal_sizes_are_borrowed() {
        let img = split(4, 4);
        let (a, b) = match_dimensions(&img, &img);
        assert!(matches!(a, Cow::Borrowed(_)) && matches!(b, Cow::Borrowed(_)));
    }
}
