//! GeoTIFF elevation reader.
//!
//! Reads the first band of a single-band GeoTIFF via the pure-Rust `tiff`
//! crate and recovers the geospatial metadata from the standard tags:
//! `ModelPixelScale` (33550) for resolution, `ModelTiepoint` (33922) for
//! the origin, and the `ProjectedCSType` geokey (3072 inside directory
//! 34735) for the UTM zone. Rasters without a recognisable projected CRS
//! fall back to the unit planar frame; lat/long queries against them fail
//! downstream with `unsupported_projection`.

use crate::raster::RasterData;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};
use trax_core::{GridOrigin, Projection, UtmZone};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const PROJECTED_CS_TYPE_KEY: u64 = 3072;

/// Load a GeoTIFF elevation raster.
pub fn load_geotiff(path: &Path) -> Result<RasterData> {
    let file =
        File::open(path).with_context(|| format!("opening GeoTIFF {}", path.display()))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .with_context(|| format!("decoding TIFF container {}", path.display()))?;
    let (width, height) = decoder.dimensions().context("reading TIFF dimensions")?;
    let (width, height) = (width as usize, height as usize);

    let pixel_scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT)).ok();
    let geo_keys = decoder.get_tag_u64_vec(Tag::Unknown(GEO_KEY_DIRECTORY)).ok();

    let image = decoder.read_image().context("reading elevation band")?;
    let samples: Vec<f64> = match image {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|z| z as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|z| z as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => bail!("unsupported TIFF sample format in {}", path.display()),
    };
    if samples.len() != width * height {
        bail!(
            "TIFF band has {} samples for a {}x{} raster (multi-band files are not supported)",
            samples.len(),
            width,
            height
        );
    }

    let resolution = pixel_scale
        .as_ref()
        .and_then(|s| s.first().copied())
        .filter(|r| r.is_finite() && *r > 0.0)
        .unwrap_or(1.0);

    let zone = geo_keys.as_deref().and_then(zone_from_geokeys);
    let origin = match (zone, tiepoint.as_deref()) {
        (Some(zone), Some(&[i, j, _k, x, y, ..])) => GridOrigin {
            // The tiepoint maps raster point (i, j) to projected (x, y) at
            // the pixel's outer corner; shift to the NW cell centre.
            easting: x - i * resolution + resolution / 2.0,
            northing: y + j * resolution - resolution / 2.0,
            projection: Projection::Utm(zone),
        },
        _ => {
            warn!(
                path = %path.display(),
                "no recognisable projected CRS; using unit planar frame"
            );
            GridOrigin::local_planar()
        }
    };

    debug!(width, height, resolution, "GeoTIFF raster loaded");
    Ok(RasterData { samples, width, height, resolution, origin })
}

/// Extract a UTM zone from a GeoKeyDirectory tag, if the projected CRS is
/// one of the common UTM EPSG families (WGS84, NAD83, NAD27).
fn zone_from_geokeys(keys: &[u64]) -> Option<UtmZone> {
    // Directory layout: a 4-entry header, then NumberOfKeys entries of
    // (KeyID, TagLocation, Count, Value). Inline values have location 0.
    let count = *keys.get(3)? as usize;
    for entry in keys[4..].chunks_exact(4).take(count) {
        if entry[0] == PROJECTED_CS_TYPE_KEY && entry[1] == 0 {
            return zone_from_epsg(entry[3]);
        }
    }
    None
}

fn zone_from_epsg(code: u64) -> Option<UtmZone> {
    match code {
        32601..=32660 => Some(UtmZone::new((code - 32600) as u8, true)),
        32701..=32760 => Some(UtmZone::new((code - 32700) as u8, false)),
        26901..=26923 => Some(UtmZone::new((code - 26900) as u8, true)),
        26703..=26722 => Some(UtmZone::new((code - 26700) as u8, true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    #[test]
    fn test_zone_from_epsg_families() {
        assert_eq!(zone_from_epsg(32605), Some(UtmZone::new(5, true)));
        assert_eq!(zone_from_epsg(32734), Some(UtmZone::new(34, false)));
        assert_eq!(zone_from_epsg(26905), Some(UtmZone::new(5, true)));
        assert_eq!(zone_from_epsg(4326), None);
    }

    #[test]
    fn test_zone_from_geokey_directory() {
        // Version header + two keys, the second naming WGS84 / UTM 5N.
        let keys = [1, 1, 0, 2, 1024, 0, 1, 1, 3072, 0, 1, 32605];
        assert_eq!(zone_from_geokeys(&keys), Some(UtmZone::new(5, true)));
        assert_eq!(zone_from_geokeys(&[1, 1, 0, 0]), None);
    }

    #[test]
    fn test_plain_tiff_round_trip_planar_fallback() {
        // A bare TIFF with no geo tags: samples decode, frame is planar.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.tif");
        let file = File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        let data: Vec<f32> = (0..12).map(|i| i as f32).collect();
        encoder
            .write_image::<colortype::Gray32Float>(4, 3, &data)
            .unwrap();

        let raster = load_geotiff(&path).unwrap();
        assert_eq!((raster.width, raster.height), (4, 3));
        assert_eq!(raster.resolution, 1.0);
        assert_eq!(raster.origin.projection, Projection::LocalPlanar);
        assert_eq!(raster.samples[5], 5.0);
    }
}
