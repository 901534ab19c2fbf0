//! Blocking render and encode stages. Both run on the blocking pool.

use crate::encoder::{encode_raster, encode_text};
use crate::layout::{self, VisualDocument};
use crate::printer::PrinterProfile;
use crate::raster::{Painter, RasterFrame, rasterize_with};

use super::{FailureReason, PrintMode, PrintRequest};

/// Output of the rendering stage.
#[derive(Debug)]
pub(crate) enum Rendered {
    Text(VisualDocument),
    Raster(RasterFrame),
}

/// Lay out the receipt and, for raster jobs, paint and rasterize it at the
/// profile's full width.
pub(crate) fn render(request: &PrintRequest, painter: &dyn Painter) -> Result<Rendered, FailureReason> {
    let profile = &request.profile;
    let template = request.template.with_default_columns(profile.chars_per_line);
    let view = layout::render(&request.document, &template)
        .map_err(|e| FailureReason::Render(e.to_string()))?;

    match request.mode {
        PrintMode::Text => Ok(Rendered::Text(view)),
        PrintMode::Raster { threshold } => {
            let width = profile.width_dots as usize;
            let canvas = painter
                .paint(&view, width)
                .map_err(|e| FailureReason::Render(e.to_string()))?;
            Ok(Rendered::Raster(rasterize_with(&canvas, width, threshold)))
        }
    }
}

/// Build the command stream for a profile already narrowed to the
/// endpoint's capabilities.
pub(crate) fn encode(rendered: &Rendered, profile: &PrinterProfile) -> Result<Vec<u8>, FailureReason> {
    let bytes = match rendered {
        Rendered::Text(view) => encode_text(view, profile),
        Rendered::Raster(frame) => encode_raster(frame, profile),
    };
    bytes.map_err(|e| FailureReason::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::demo_sale;
    use crate::raster::{BitmapPainter, Threshold};
    use crate::template::TemplateConfig;

    #[test]
    fn test_text_render_then_encode() {
        let request = PrintRequest::new(demo_sale()).with_profile(PrinterProfile::escpos_80());
        let rendered = render(&request, &BitmapPainter::new()).unwrap();
        assert!(matches!(rendered, Rendered::Text(_)));

        let bytes = encode(&rendered, &request.profile).unwrap();
        assert_eq!(&bytes[..2], &[0x1B, 0x40]);
    }

    #[test]
    fn test_raster_frame_spans_profile_width() {
        let request = PrintRequest::new(demo_sale())
            .with_profile(PrinterProfile::escpos_58())
            .with_mode(PrintMode::Raster {
                threshold: Threshold::Fixed,
            });
        match render(&request, &BitmapPainter::new()).unwrap() {
            Rendered::Raster(frame) => {
                assert_eq!(frame.width, 384);
                assert!(frame.height > 0);
            }
            other => panic!("expected raster, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_currency_is_render_failure() {
        let template = TemplateConfig {
            currency: "XXX".into(),
            ..TemplateConfig::default()
        };
        let request = PrintRequest::new(demo_sale()).with_template(template);
        let err = render(&request, &BitmapPainter::new()).unwrap_err();
        assert!(matches!(err, FailureReason::Render(_)));
    }

    #[test]
    fn test_raster_on_text_only_profile_is_encode_failure() {
        let request = PrintRequest::new(demo_sale()).with_mode(PrintMode::Raster {
            threshold: Threshold::Fixed,
        });
        let rendered = render(&request, &BitmapPainter::new()).unwrap();
        let err = encode(&rendered, &PrinterProfile::text_only()).unwrap_err();
        assert!(matches!(err, FailureReason::Encode(_)));
    }
}
