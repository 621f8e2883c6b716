//! PDF rendering through the page's html2pdf and Blob downloads

use js_sys::{Array, Function, Promise, Reflect};
use portal_core::export::{Download, PdfExport, PRINT_FRAME};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, HtmlIFrameElement, Url};

use crate::{log, to_js};

fn call_method(target: &JsValue, name: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("{} is not a function", name)))?;
    let args: Array = args.iter().copied().collect();
    method.apply(target, &args)
}

/// Render `export` in a hidden frame and save it as a PDF. The frame is
/// removed whatever happens; failures are reported with an alert.
pub async fn save_pdf(export: &PdfExport) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;
    let body = document.body().ok_or("No body")?;

    let frame: HtmlIFrameElement = document.create_element("iframe")?.dyn_into()?;
    frame.set_attribute("style", &PRINT_FRAME.css())?;
    body.append_child(&frame)?;

    let result = render_in_frame(&window, &frame, export).await;
    frame.remove();

    if let Err(e) = &result {
        let reason = e.as_string().unwrap_or_else(|| "unknown error".to_string());
        log(&format!("PDF export failed: {}", reason));
        let _ = window.alert_with_message(&format!("Error generating PDF: {}", reason));
    }
    result
}

async fn render_in_frame(
    window: &web_sys::Window,
    frame: &HtmlIFrameElement,
    export: &PdfExport,
) -> Result<(), JsValue> {
    let frame_doc = frame.content_document().ok_or("Print frame has no document")?;
    let root = frame_doc
        .document_element()
        .ok_or("Print frame has no root element")?;
    root.set_inner_html(&export.html);
    let target: JsValue = frame_doc.body().ok_or("Print frame has no body")?.into();

    let html2pdf: Function = Reflect::get(window, &JsValue::from_str("html2pdf"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("html2pdf is not loaded"))?;
    let worker = html2pdf.call0(&JsValue::NULL)?;
    let worker = call_method(&worker, "set", &[&to_js(&export.options)?])?;
    let worker = call_method(&worker, "from", &[&target])?;
    let saving = call_method(&worker, "save", &[])?;

    // html2pdf returns a thenable worker rather than a native Promise
    JsFuture::from(Promise::resolve(&saving)).await?;
    log(&format!("Saved {}", export.options.filename));
    Ok(())
}

/// Offer `download` to the user as a file
pub fn save_download(download: &Download) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let document = window.document().ok_or("No document")?;
    let body = document.body().ok_or("No body")?;

    let parts = Array::of1(&JsValue::from_str(&download.content));
    let options = BlobPropertyBag::new();
    options.set_type(download.mime_type);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(&download.file_name);
    body.append_child(&anchor)?;
    anchor.click();
    anchor.remove();
    Url::revoke_object_url(&url)?;
    Ok(())
}
