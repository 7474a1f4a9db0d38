//! Spreadsheet rendering of stored diagnostic reports.
//!
//! Maps a persisted report into a formatted xlsx workbook: title banner,
//! report metadata, the emphasized final verdict, the confidence panel, the
//! per-view states, and the five view images embedded at a fixed display
//! size. Any single image that cannot be fetched degrades to a placeholder
//! cell; it never aborts the document.

use std::time::Duration;

use rust_xlsxwriter::{Color, Format, FormatAlign, Image, Workbook, XlsxError};
use thiserror::Error;

use crate::config::defaults::EXPORT_FETCH_TIMEOUT_SECS;
use crate::storage::BlobStore;
use crate::types::{DiagnosticReport, ImageRef};

/// Shown in place of a view image that could not be fetched or embedded.
const IMAGE_PLACEHOLDER: &str = "Imagen no disponible";

/// Banner fill color for the title row.
const BANNER_COLOR: u32 = 0x4F81BD;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("workbook error: {0}")]
    Workbook(#[from] XlsxError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Render a report as xlsx bytes.
///
/// Images resolve through the local blob store first (by opaque key), then
/// over HTTP for URL references; each failure downgrades that one cell to a
/// placeholder.
pub async fn render_report(
    report: &DiagnosticReport,
    blobs: Option<&BlobStore>,
    image_edge_px: u32,
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Reporte Diagnóstico")?;

    let title_format = Format::new()
        .set_font_name("Calibri")
        .set_font_size(16)
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(BANNER_COLOR))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let header_format = Format::new().set_font_name("Calibri").set_font_size(12).set_bold();
    let view_header_format = Format::new()
        .set_font_name("Calibri")
        .set_font_size(12)
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);

    worksheet.merge_range(0, 0, 0, 4, "Reporte de Diagnóstico de Pieza Hidráulica", &title_format)?;
    worksheet.set_row_height(0, 30)?;

    worksheet.write_string(2, 0, "ID del Reporte:")?;
    worksheet.write_string(2, 1, &report.report_id)?;
    worksheet.write_string(3, 0, "Fecha (UTC):")?;
    worksheet.write_string(3, 1, report.created_at.format("%Y-%m-%d %H:%M:%S").to_string())?;

    worksheet.write_string_with_format(5, 0, "RESULTADOS DEL DIAGNÓSTICO", &header_format)?;
    worksheet.write_string(6, 0, "Pieza Identificada:")?;
    worksheet.write_string(6, 1, &report.part)?;
    worksheet.write_string_with_format(7, 0, "Diagnóstico Agregado Final:", &header_format)?;
    worksheet.write_string_with_format(7, 1, report.state.to_uppercase(), &header_format)?;
    worksheet.write_string(8, 0, "Sugerencia de Acción:")?;
    worksheet.write_string(8, 1, &report.suggestion)?;

    worksheet.write_string_with_format(5, 3, "PANEL DE CONFIANZA", &header_format)?;
    for (i, entry) in report.confidence_panel.iter().enumerate() {
        let row = 6 + i as u32;
        worksheet.write_string(row, 3, format!("{}:", capitalize(&entry.state)))?;
        worksheet.write_string(row, 4, &entry.confidence)?;
    }

    worksheet.write_string_with_format(12, 0, "DIAGNÓSTICO POR VISTA", &header_format)?;
    for (i, state) in report.view_states.iter().enumerate() {
        let row = 13 + i as u32;
        worksheet.write_string(row, 0, format!("Vista {}:", i + 1))?;
        worksheet.write_string(row, 1, state)?;
    }

    worksheet.write_string_with_format(19, 0, "EVIDENCIA FOTOGRÁFICA", &header_format)?;
    if !report.images.is_empty() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(EXPORT_FETCH_TIMEOUT_SECS))
            .build()?;

        for (i, image_ref) in report.images.iter().enumerate() {
            let col = i as u16;
            worksheet.write_string_with_format(20, col, format!("Vista {}", i + 1), &view_header_format)?;

            match fetch_image(&client, blobs, image_ref).await {
                Some(bytes) => match embed_image(&bytes, image_edge_px) {
                    Ok(image) => {
                        worksheet.insert_image(21, col, &image)?;
                        worksheet.set_row_height(21, 95)?;
                    }
                    Err(e) => {
                        tracing::warn!(key = %image_ref.blob_key, "Could not embed image: {}", e);
                        worksheet.write_string(21, col, IMAGE_PLACEHOLDER)?;
                    }
                },
                None => {
                    tracing::warn!(key = %image_ref.blob_key, "Could not fetch image");
                    worksheet.write_string(21, col, IMAGE_PLACEHOLDER)?;
                }
            }
        }
    }

    worksheet.set_column_width(0, 25)?;
    worksheet.set_column_width(1, 30)?;
    worksheet.set_column_width(3, 15)?;
    worksheet.set_column_width(4, 15)?;

    Ok(workbook.save_to_buffer()?)
}

/// Resolve an image reference: local blob first, then HTTP.
async fn fetch_image(
    client: &reqwest::Client,
    blobs: Option<&BlobStore>,
    image_ref: &ImageRef,
) -> Option<Vec<u8>> {
    if let Some(store) = blobs {
        if let Ok(bytes) = store.get(&image_ref.blob_key) {
            return Some(bytes);
        }
    }

    if image_ref.url.starts_with("http://") || image_ref.url.starts_with("https://") {
        let response = client
            .get(&image_ref.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .ok()?;
        return response.bytes().await.ok().map(|b| b.to_vec());
    }

    None
}

fn embed_image(bytes: &[u8], edge_px: u32) -> Result<Image, XlsxError> {
    let edge = f64::from(edge_px);
    Ok(Image::new_from_buffer(bytes)?.set_scale_to_size(edge, edge, false))
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
