//! PDF receipt rendering.
//!
//! Receipts are rendered in memory and handed to the mailer as an
//! attachment; nothing is written to disk.

use crate::errors::{DispatchError, Result};
use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_decimal::Decimal;
use std::io::BufWriter;
use uuid::Uuid;

pub struct ReceiptData {
    pub ride_id: Uuid,
    pub pickup: String,
    pub dropoff: String,
    pub ride_type: String,
    pub fare: Decimal,
    pub driver_name: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Render a one-page A4 receipt, returning the PDF bytes.
pub fn render_receipt(data: &ReceiptData) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new("Ride Receipt", Mm(210.0), Mm(297.0), "receipt");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| DispatchError::Internal(format!("pdf font load failed: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| DispatchError::Internal(format!("pdf font load failed: {e}")))?;

    let layer = doc.get_page(page).get_layer(layer);

    layer.use_text("Ride Receipt", 22.0, Mm(20.0), Mm(270.0), &bold);
    layer.use_text(
        format!("Receipt for ride {}", data.ride_id),
        10.0,
        Mm(20.0),
        Mm(260.0),
        &regular,
    );
    layer.use_text(
        format!("Completed: {}", data.completed_at.format("%Y-%m-%d %H:%M UTC")),
        10.0,
        Mm(20.0),
        Mm(254.0),
        &regular,
    );

    let mut y = 236.0_f32;
    let line = |label: &str, value: &str, y: f32| {
        layer.use_text(label, 11.0, Mm(20.0), Mm(y), &bold);
        layer.use_text(value, 11.0, Mm(70.0), Mm(y), &regular);
    };

    line("Pickup", &data.pickup, y);
    y -= 8.0;
    line("Dropoff", &data.dropoff, y);
    y -= 8.0;
    line("Ride type", &data.ride_type, y);
    y -= 8.0;
    if let Some(driver) = &data.driver_name {
        line("Driver", driver, y);
        y -= 8.0;
    }
    line("Fare", &format!("INR {}", data.fare), y);

    let mut buffer = Vec::new();
    doc.save(&mut BufWriter::new(&mut buffer))
        .map_err(|e| DispatchError::Internal(format!("pdf render failed: {e}")))?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> ReceiptData {
        ReceiptData {
            ride_id: Uuid::new_v4(),
            pickup: "MG Road".into(),
            dropoff: "Koramangala".into(),
            ride_type: "premium".into(),
            fare: dec!(154.50),
            driver_name: Some("A. Driver".into()),
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn renders_nonempty_pdf() {
        let bytes = render_receipt(&sample()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn renders_without_driver_name() {
        let mut data = sample();
        data.driver_name = None;
        assert!(render_receipt(&data).is_ok());
    }
}
