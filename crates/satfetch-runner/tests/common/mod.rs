//! Shared helpers for runner integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Query parameters recorded by the mock server.
const QUERY_KEYS: &[&str] = &["bbox", "bboxSR", "imageSR", "size", "format", "dpi", "f"];

/// Local stand-in for the MapServer export endpoint.
///
/// Answers every request with a PNG of the requested size, except requests
/// whose `bbox` is listed in `failing_bboxes`, which get HTTP 500.
pub struct MockExport {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<HashMap<String, String>>>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockExport {
    pub fn start() -> Self {
        Self::start_failing(Vec::new())
    }

    pub fn start_failing(failing_bboxes: Vec<String>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        let server = rouille::Server::new("127.0.0.1:0", move |request: &rouille::Request| {
            let params: HashMap<String, String> = QUERY_KEYS
                .iter()
                .filter_map(|k| request.get_param(k).map(|v| (k.to_string(), v)))
                .collect();
            recorded.lock().unwrap().push(params.clone());

            let bbox = params.get("bbox").cloned().unwrap_or_default();
            if failing_bboxes.contains(&bbox) {
                return rouille::Response::text("export failed").with_status_code(500);
            }

            let size = params
                .get("size")
                .and_then(|s| s.split(',').next())
                .and_then(|w| w.parse().ok())
                .unwrap_or(224);
            rouille::Response::from_data("image/png", png_bytes(size, size))
        })
        .expect("Failed to start mock server");

        let addr = server.server_addr();
        let (handle, stop) = server.stoppable();

        Self {
            addr,
            requests,
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/ArcGIS/rest/services/World_Imagery/MapServer/export", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockExport {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A solid-color PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([34, 110, 52]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf.into_inner()
}

/// Write a `lat,long` CSV with one row per coordinate and return its path.
pub fn write_csv(dir: &Path, coords: &[(f64, f64)]) -> PathBuf {
    let mut text = String::from("id,lat,long\n");
    for (i, (lat, lon)) in coords.iter().enumerate() {
        writeln!(text, "{},{},{}", 1000 + i, lat, lon).unwrap();
    }
    let path = dir.join("input.csv");
    fs::write(&path, text).expect("Failed to write CSV");
    path
}

/// Write a `lat`/`long` workbook with one row per coordinate and return its path.
pub fn write_xlsx(dir: &Path, coords: &[(f64, f64)]) -> PathBuf {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "id").unwrap();
    sheet.write_string(0, 1, "lat").unwrap();
    sheet.write_string(0, 2, "long").unwrap();
    for (i, (lat, lon)) in coords.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, (1000 + i) as f64).unwrap();
        sheet.write_number(row, 1, *lat).unwrap();
        sheet.write_number(row, 2, *lon).unwrap();
    }
    let path = dir.join("train.xlsx");
    workbook.save(&path).expect("Failed to write workbook");
    path
}

/// `n` distinct coordinates around New York.
pub fn sample_coords(n: usize) -> Vec<(f64, f64)> {
    (0..n)
        .map(|i| (40.0 + i as f64 * 0.01, -74.0 - i as f64 * 0.01))
        .collect()
}

/// Sorted names of the `.png` files in a directory.
pub fn png_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read image dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".png"))
        .collect();
    names.sort();
    names
}
