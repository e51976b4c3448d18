//! Common test utilities for the cbz2epub crate.
//!
//! Provides builders for fixture images and archives, and readers that pull
//! the manifest, spine and page images back out of a generated package.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use rand::Rng;
use regex::Regex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[allow(dead_code)]
pub const LONG_TEST_TIMEOUT: Duration = Duration::from_secs(120);

#[allow(dead_code)]
pub const RED: Rgb<u8> = Rgb([220, 20, 20]);
#[allow(dead_code)]
pub const GREEN: Rgb<u8> = Rgb([20, 220, 20]);
#[allow(dead_code)]
pub const BLUE: Rgb<u8> = Rgb([20, 20, 220]);

/// Encodes a single-colour image in the given format.
#[allow(dead_code)]
pub fn solid_image(width: u32, height: u32, color: Rgb<u8>, format: ImageFormat) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, color)),
        format,
    )
}

/// Encodes a fully transparent PNG.
#[allow(dead_code)]
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]))),
        ImageFormat::Png,
    )
}

/// Encodes a PNG of random noise, which compresses very differently per quality.
#[allow(dead_code)]
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let img = RgbImage::from_fn(width, height, |_, _| Rgb([rng.r#gen(), rng.r#gen(), rng.r#gen()]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Encodes a JPEG whose APP1 Exif segment carries the given orientation tag.
///
/// `width` and `height` are the stored pixel dimensions, before any rotation
/// a viewer would apply.
#[allow(dead_code)]
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let jpeg = solid_image(width, height, Rgb([128, 128, 128]), ImageFormat::Jpeg);

    // Little-endian TIFF header, then a single IFD entry: Orientation (0x0112), SHORT, count 1.
    let mut payload = b"Exif\0\0II*\0".to_vec();
    payload.extend_from_slice(&8u32.to_le_bytes());
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&0x0112u16.to_le_bytes());
    payload.extend_from_slice(&3u16.to_le_bytes());
    payload.extend_from_slice(&1u32.to_le_bytes());
    payload.extend_from_slice(&orientation.to_le_bytes());
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&0u32.to_le_bytes());

    let segment_len = u16::try_from(payload.len() + 2).unwrap();
    let mut bytes = jpeg[..2].to_vec();
    bytes.extend_from_slice(&[0xFF, 0xE1]);
    bytes.extend_from_slice(&segment_len.to_be_bytes());
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(&jpeg[2..]);
    bytes
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

/// Writes a zip archive with the given entries, in the given storage order.
/// Names ending in `/` become directory entries.
#[allow(dead_code)]
pub fn write_cbz(path: &Path, entries: &[(&str, Vec<u8>)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Writes a zip archive whose entries are protected with legacy ZipCrypto.
#[allow(dead_code)]
pub fn write_encrypted_cbz(path: &Path, entries: &[(&str, Vec<u8>)], password: &[u8]) {
    use zip::unstable::write::FileOptionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .with_deprecated_encryption(password);
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// The parts of a generated package the tests care about.
#[allow(dead_code)]
pub struct PackageContents {
    pub entry_names: Vec<String>,
    pub first_entry: String,
    pub first_entry_stored: bool,
    pub opf: String,
    /// Image entries in name order, with their decoded dimensions and mean colour.
    pub images: Vec<(String, u32, u32, Rgb<u8>)>,
}

#[allow(dead_code)]
impl PackageContents {
    pub fn markup_pages(&self) -> Vec<&String> {
        self.entry_names
            .iter()
            .filter(|name| name.contains("pages/page_") && name.ends_with(".xhtml"))
            .collect()
    }

    /// Spine entries resolved to their manifest hrefs.
    pub fn spine_hrefs(&self) -> Vec<String> {
        let item_re = Regex::new(r"<item\b[^>]*>").unwrap();
        let id_re = Regex::new(r#"\bid="([^"]*)""#).unwrap();
        let href_re = Regex::new(r#"\bhref="([^"]*)""#).unwrap();
        let idref_re = Regex::new(r#"\bidref="([^"]*)""#).unwrap();

        let manifest: HashMap<String, String> = item_re
            .find_iter(&self.opf)
            .filter_map(|item| {
                let tag = item.as_str();
                let id = id_re.captures(tag)?.get(1)?.as_str().to_string();
                let href = href_re.captures(tag)?.get(1)?.as_str().to_string();
                Some((id, href))
            })
            .collect();

        let spine_start = self.opf.find("<spine").unwrap();
        let spine_end = self.opf[spine_start..].find("</spine>").unwrap() + spine_start;
        idref_re
            .captures_iter(&self.opf[spine_start..spine_end])
            .filter_map(|cap| manifest.get(cap.get(1)?.as_str()).cloned())
            .collect()
    }
}

/// Opens a generated package and extracts its structure.
#[allow(dead_code)]
pub fn read_package(path: &Path) -> PackageContents {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();

    let (first_entry, first_entry_stored) = {
        let first = archive.by_index(0).unwrap();
        (
            first.name().to_string(),
            first.compression() == CompressionMethod::Stored,
        )
    };

    let entry_names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let opf_name = entry_names
        .iter()
        .find(|name| name.ends_with(".opf"))
        .expect("package has no OPF document")
        .clone();
    let mut opf = String::new();
    archive
        .by_name(&opf_name)
        .unwrap()
        .read_to_string(&mut opf)
        .unwrap();

    let mut image_names: Vec<String> = entry_names
        .iter()
        .filter(|name| name.contains("images/page_"))
        .cloned()
        .collect();
    image_names.sort();

    let images = image_names
        .into_iter()
        .map(|name| {
            let mut bytes = Vec::new();
            archive
                .by_name(&name)
                .unwrap()
                .read_to_end(&mut bytes)
                .unwrap();
            let img = image::load_from_memory(&bytes).unwrap().to_rgb8();
            let color = mean_color(&img);
            (name, img.width(), img.height(), color)
        })
        .collect();

    PackageContents {
        entry_names,
        first_entry,
        first_entry_stored,
        opf,
        images,
    }
}

/// Average colour of an image.
#[allow(dead_code)]
pub fn mean_color(img: &RgbImage) -> Rgb<u8> {
    let count = u64::from(img.width()) * u64::from(img.height());
    let mut sums = [0u64; 3];
    for pixel in img.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }
    Rgb(sums.map(|sum| (sum / count.max(1)) as u8))
}

/// True when `color` is within a JPEG-tolerant distance of `expected`.
#[allow(dead_code)]
pub fn close_to(color: Rgb<u8>, expected: Rgb<u8>) -> bool {
    color
        .0
        .iter()
        .zip(expected.0)
        .all(|(c, e)| c.abs_diff(e) <= 24)
}
