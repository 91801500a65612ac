use std::path::{Path, PathBuf};

use crate::canvas::{Canvas, Point};
use crate::error::QuireError;
use crate::style::Color;

/// An image reference. Without a path the element draws a placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    path: Option<PathBuf>,
}

impl Image {
    /// Reference an existing file; fails with `ImageNotFound` otherwise.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, QuireError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(QuireError::ImageNotFound {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            path: Some(path.to_path_buf()),
        })
    }

    pub fn placeholder() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Draw at `p`, scaled to `w` and/or `h`. One given side keeps the
    /// aspect ratio; none means natural size.
    pub(super) fn draw(&self, p: Point, w: Option<f64>, h: Option<f64>, canvas: &mut dyn Canvas) -> Result<(), QuireError> {
        let Some(path) = &self.path else {
            if let (Some(w), Some(h)) = (w, h) {
                draw_placeholder(p, w, h, canvas);
            }
            return Ok(());
        };

        let (iw, ih) = canvas.image_size(path)?;
        if iw <= 0.0 || ih <= 0.0 {
            return Ok(());
        }
        let (sx, sy) = match (w, h) {
            (Some(w), Some(h)) => (w / iw, h / ih),
            (Some(w), None) => (w / iw, w / iw),
            (None, Some(h)) => (h / ih, h / ih),
            (None, None) => (1.0, 1.0),
        };
        if sx <= 0.0 || sy <= 0.0 {
            return Ok(());
        }
        canvas.scale(sx, sy);
        let drawn = canvas.image(path, Point::new(p.x / sx, p.y / sy), None, None);
        canvas.scale(1.0 / sx, 1.0 / sy);
        drawn
    }
}

/// A gray box with a cross through it.
fn draw_placeholder(p: Point, w: f64, h: f64, canvas: &mut dyn Canvas) {
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    canvas.fill(Some(Color::gray(0.8)));
    canvas.stroke(Some(Color::gray(0.5)), 0.5);
    canvas.rect(p.x, p.y, w, h);
    canvas.line(p, Point::new(p.x + w, p.y + h));
    canvas.line(Point::new(p.x, p.y + h), Point::new(p.x + w, p.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::display::{DisplayCanvas, DrawOp};
    use crate::element::{Element, Frame};

    fn png_file(name: &str, w: u32, h: u32) -> PathBuf {
        let path = std::env::temp_dir().join(format!("quire-{}-{}.png", name, std::process::id()));
        image::RgbImage::from_pixel(w, h, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let err = Image::new("/nonexistent/quire/cover.png").unwrap_err();
        assert!(matches!(err, QuireError::ImageNotFound { .. }));
    }

    #[test]
    fn test_placeholder_draws_crossed_box() {
        let mut element = Element::image(Image::placeholder()).size(20.0, 10.0);
        let mut canvas = DisplayCanvas::new();
        element.build(0.0, 0.0, &mut canvas, Frame::default()).unwrap();
        let ops = &canvas.pages()[0].ops;
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], DrawOp::Rect { .. }));
        assert!(matches!(ops[1], DrawOp::Line { .. }));
    }

    #[test]
    fn test_scaled_draw_brackets_image() {
        let path = png_file("scaled", 4, 2);
        let mut element = Element::image(Image::new(&path).unwrap()).at(10.0, 20.0);
        element.w = Some(8.0);
        let mut canvas = DisplayCanvas::new();
        element.build(0.0, 0.0, &mut canvas, Frame::default()).unwrap();
        let ops = &canvas.pages()[0].ops;
        assert_eq!(ops[0], DrawOp::Scale { sx: 2.0, sy: 2.0 });
        match &ops[1] {
            DrawOp::Image { x, y, w, h, .. } => {
                assert_eq!((*x, *y), (5.0, 10.0));
                assert_eq!((*w, *h), (4.0, 2.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ops[2], DrawOp::Scale { sx: 0.5, sy: 0.5 });
        let _ = std::fs::remove_file(&path);
    }
}
