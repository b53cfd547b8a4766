//! Styling coordinator.
//!
//! Colors a reference map, turns its color table into a style document and
//! attaches that style to every published layer.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::{info, instrument, warn};

use geoserver_client::{GeoServerClient, GeoServerError};
use grass_store::parse::strip_mapset;
use grass_store::RasterStore;
use publish_common::{ColorRampRange, DatasetKind, DatasetType};

use crate::error::{PublishError, Result};
use crate::resolve::resolve_dataset;

const COLOR_MAP: &[u8] = b"ColorMap";
const COLOR_MAP_ENTRY: &[u8] = b"ColorMapEntry";

fn style_error(e: impl std::fmt::Display) -> PublishError {
    PublishError::Style(e.to_string())
}

/// Whether `e` is the entry the style generator emits for an unmapped
/// extremum: a `ColorMapEntry` whose quantity is NaN.
fn is_nan_entry(e: &BytesStart) -> bool {
    e.local_name().as_ref() == COLOR_MAP_ENTRY
        && e.attributes().flatten().any(|attr| {
            attr.key.local_name().as_ref() == b"quantity"
                && String::from_utf8_lossy(&attr.value)
                    .trim()
                    .eq_ignore_ascii_case("nan")
        })
}

/// Fully transparent entry for the reserved no-data value 0, in the
/// namespace prefix of `color_map`.
fn nodata_entry_for(color_map: &BytesStart) -> BytesStart<'static> {
    let name = match color_map.name().prefix() {
        Some(prefix) => format!(
            "{}:ColorMapEntry",
            String::from_utf8_lossy(prefix.as_ref())
        ),
        None => "ColorMapEntry".to_string(),
    };
    BytesStart::new(name).with_attributes([
        ("color", "#000000"),
        ("opacity", "0"),
        ("quantity", "0"),
    ])
}

/// Clean a generated style document before upload.
///
/// Every NaN `ColorMapEntry` is dropped together with the whitespace
/// leading up to it. Unless `nodata_entry` is false, a transparent
/// quantity-0 entry becomes the first child of each `ColorMap`, indented
/// like the entries that follow it. Everything else passes through
/// byte for byte.
pub fn postprocess_style(sld: &str, nodata_entry: bool) -> Result<String> {
    let mut reader = Reader::from_str(sld);
    let mut writer = Writer::new(Vec::with_capacity(sld.len() + 64));

    // Whitespace is held back until the next event shows whether it stays.
    let mut pending_ws: Option<BytesText> = None;
    // Entry still to be written after an opening ColorMap tag.
    let mut pending_entry: Option<BytesStart<'static>> = None;
    // Nesting depth inside a dropped non-empty entry.
    let mut skipping = 0usize;
    let mut color_maps = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            style_error(format!("at position {}: {}", reader.buffer_position(), e))
        })?;

        if skipping > 0 {
            match event {
                Event::Start(_) => skipping += 1,
                Event::End(_) => skipping -= 1,
                Event::Eof => return Err(style_error("unclosed ColorMapEntry")),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Empty(e) if is_nan_entry(&e) => {
                if let Some(entry) = pending_entry.take() {
                    emit(&mut writer, Event::Empty(entry))?;
                }
                pending_ws = None;
            }
            Event::Start(e) if is_nan_entry(&e) => {
                if let Some(entry) = pending_entry.take() {
                    emit(&mut writer, Event::Empty(entry))?;
                }
                pending_ws = None;
                skipping = 1;
            }
            Event::Start(e) if e.local_name().as_ref() == COLOR_MAP => {
                flush_ws(&mut writer, &mut pending_ws)?;
                if nodata_entry {
                    pending_entry = Some(nodata_entry_for(&e));
                }
                emit(&mut writer, Event::Start(e))?;
                color_maps += 1;
            }
            Event::Empty(e) if e.local_name().as_ref() == COLOR_MAP => {
                flush_ws(&mut writer, &mut pending_ws)?;
                if nodata_entry {
                    emit(&mut writer, Event::Start(e.borrow()))?;
                    emit(&mut writer, Event::Empty(nodata_entry_for(&e)))?;
                    emit(&mut writer, Event::End(e.to_end()))?;
                } else {
                    emit(&mut writer, Event::Empty(e))?;
                }
                color_maps += 1;
            }
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => {
                flush_ws(&mut writer, &mut pending_ws)?;
                if let Some(entry) = pending_entry.take() {
                    emit(&mut writer, Event::Text(text.borrow()))?;
                    emit(&mut writer, Event::Empty(entry))?;
                }
                pending_ws = Some(text);
            }
            Event::Eof => {
                if let Some(entry) = pending_entry.take() {
                    emit(&mut writer, Event::Empty(entry))?;
                }
                flush_ws(&mut writer, &mut pending_ws)?;
                break;
            }
            other => {
                if let Some(entry) = pending_entry.take() {
                    emit(&mut writer, Event::Empty(entry))?;
                }
                flush_ws(&mut writer, &mut pending_ws)?;
                emit(&mut writer, other)?;
            }
        }
    }

    if nodata_entry && color_maps == 0 {
        warn!("Style document has no ColorMap, no-data entry not added");
    }
    String::from_utf8(writer.into_inner()).map_err(style_error)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<()> {
    writer.write_event(event).map_err(style_error)
}

fn flush_ws<'a>(writer: &mut Writer<Vec<u8>>, pending: &mut Option<BytesText<'a>>) -> Result<()> {
    match pending.take() {
        Some(text) => emit(writer, Event::Text(text)),
        None => Ok(()),
    }
}

/// Color `reference_map` with `ramp`, generate its style and attach it to
/// every layer in `layers`.
#[instrument(skip(store, client, range, layers), fields(map = %reference_map, ramp = %ramp))]
pub async fn style_layers<S: RasterStore + ?Sized>(
    store: &S,
    client: &GeoServerClient,
    reference_map: &str,
    ramp: &str,
    range: ColorRampRange,
    layers: &[String],
    nodata_entry: bool,
) -> Result<()> {
    store
        .apply_colors(reference_map, ramp, range.offset_scale())
        .await?;
    let sld = postprocess_style(&store.style_document(reference_map).await?, nodata_entry)?;

    for layer in layers {
        client.attach_style(layer, sld.clone()).await?;
    }

    info!(layers = layers.len(), "Styles attached");
    Ok(())
}

/// Options of the standalone `style` command.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// Published layer to style
    pub layer: String,
    /// Map or STRDS to take the color table from; defaults to the layer's
    /// native coverage
    pub grass_map: Option<String>,
    pub dataset_type: DatasetType,
    pub nodata_entry: bool,
}

/// Style an already published layer from a map's existing color table.
///
/// Returns the map the style was generated from.
#[instrument(skip_all, fields(layer = %options.layer))]
pub async fn style_existing_layer<S: RasterStore + ?Sized>(
    store: &S,
    client: &GeoServerClient,
    options: &StyleOptions,
) -> Result<String> {
    let layer_def = client.get_layer(&options.layer).await?;

    let dataset = match options.grass_map.as_deref().filter(|m| !m.is_empty()) {
        Some(map) => strip_mapset(map).to_string(),
        None => {
            let coverage = client.get_layer_resource(&layer_def).await?;
            let native = coverage["coverage"]["nativeCoverageName"]
                .as_str()
                .ok_or_else(|| GeoServerError::InvalidResponse {
                    operation: "Fetching of layer resource".to_string(),
                    message: "coverage has no nativeCoverageName".to_string(),
                })?;
            strip_mapset(native).to_string()
        }
    };

    let map = match resolve_dataset(store, &dataset, options.dataset_type).await? {
        DatasetKind::Raster => dataset,
        DatasetKind::Strds => store
            .list_map_names(&dataset)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PublishError::EmptySeries(dataset.clone()))?,
    };

    let sld = postprocess_style(&store.style_document(&map).await?, options.nodata_entry)?;
    client.create_style(&options.layer).await?;
    client.upload_style(&options.layer, sld).await?;
    client
        .set_default_style(&options.layer, &options.layer, layer_def)
        .await?;

    info!(map = %map, "Layer styled");
    Ok(map)
}
