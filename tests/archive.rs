use std::collections::HashMap;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use ceo_bars_catalog::app::{ProgressEvent, ProgressSink};
use ceo_bars_catalog::archive::{BulkDownloader, DOWNLOAD_FAILURE};
use ceo_bars_catalog::domain::TrackRecord;
use ceo_bars_catalog::error::CatalogError;
use ceo_bars_catalog::fetch::AssetFetcher;
use ceo_bars_catalog::notify::{Toast, ToastKind};
use ceo_bars_catalog::save::SaveTarget;

const ARCHIVE: &str = "CEO_Bars_Complete_Collection.zip";

fn track(id: u64, title: &str) -> TrackRecord {
    TrackRecord {
        id,
        title: title.to_string(),
        artist: "Adi 55".to_string(),
        album: "SINGLES".to_string(),
        duration: "3:00".to_string(),
        file: format!("https://cdn/{id}/master.mp3"),
        cover_art: String::new(),
        description: String::new(),
        release_date: String::new(),
        featuring: vec!["Adi 55".to_string()],
        instrumental: String::new(),
    }
}

fn catalog() -> Vec<TrackRecord> {
    vec![
        track(1, "CEO Bars"),
        track(2, "Zen Flow"),
        track(3, "Street Theory"),
    ]
}

/// Serves `id-<n>` bodies; urls listed in `failing` return the given status.
#[derive(Default)]
struct MockFetcher {
    failing: HashMap<String, u16>,
    calls: Mutex<Vec<String>>,
}

impl AssetFetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(status) = self.failing.get(url) {
            return Err(CatalogError::FetchStatus {
                url: url.to_string(),
                status: *status,
            });
        }
        Ok(format!("audio:{url}").into_bytes())
    }
}

#[derive(Default, Clone)]
struct MemorySave {
    saved: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl SaveTarget for MemorySave {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<Utf8PathBuf, CatalogError> {
        self.saved
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes.to_vec()));
        Ok(Utf8PathBuf::from("/downloads").join(file_name))
    }
}

#[derive(Default)]
struct RecordingSink {
    percents: Mutex<Vec<u8>>,
    toasts: Mutex<Vec<Toast>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        if let Some(percent) = event.percent {
            self.percents.lock().unwrap().push(percent);
        }
    }

    fn notify(&self, toast: &Toast) {
        self.toasts.lock().unwrap().push(toast.clone());
    }
}

fn entry_names(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            (entry.name().to_string(), body)
        })
        .collect()
}

#[test]
fn archives_every_track_in_order() {
    let saver = MemorySave::default();
    let downloader = BulkDownloader::new(MockFetcher::default(), saver.clone(), ARCHIVE, 1);
    let sink = RecordingSink::default();

    let report = downloader.download_all(&catalog(), &sink).unwrap();

    assert_eq!(
        report.entries,
        vec![
            "01 - Adi 55 - CEO Bars.mp3",
            "02 - Adi 55 - Zen Flow.mp3",
            "03 - Adi 55 - Street Theory.mp3",
        ]
    );
    let saved = saver.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0, ARCHIVE);
    let entries = entry_names(&saved[0].1);
    assert_eq!(entries[1].0, "02 - Adi 55 - Zen Flow.mp3");
    assert_eq!(entries[1].1, "audio:https://cdn/2/master.mp3");

    let percents = sink.percents.lock().unwrap().clone();
    assert_eq!(percents, vec![0, 33, 67, 100]);
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        sink.toasts.lock().unwrap().last(),
        Some(&Toast::success("Download complete!"))
    );
    assert!(!downloader.is_bulk_in_progress());
    assert_eq!(downloader.progress(), 0);
}

#[test]
fn failed_item_saves_nothing() {
    let fetcher = MockFetcher {
        failing: HashMap::from([("https://cdn/2/master.mp3".to_string(), 404)]),
        ..MockFetcher::default()
    };
    let saver = MemorySave::default();
    let downloader = BulkDownloader::new(fetcher, saver.clone(), ARCHIVE, 1);
    let sink = RecordingSink::default();

    let err = downloader.download_all(&catalog(), &sink).unwrap_err();

    assert_matches!(err, CatalogError::FetchStatus { status: 404, .. });
    assert!(saver.saved.lock().unwrap().is_empty());
    assert_eq!(*sink.percents.lock().unwrap(), vec![0, 33]);
    assert_eq!(
        sink.toasts.lock().unwrap().last(),
        Some(&Toast::error(DOWNLOAD_FAILURE))
    );
    assert_eq!(downloader.progress(), 0);
    assert!(!downloader.is_bulk_in_progress());
}

#[test]
fn bounded_concurrency_keeps_catalog_order() {
    let saver = MemorySave::default();
    let downloader = BulkDownloader::new(MockFetcher::default(), saver.clone(), ARCHIVE, 2);
    let sink = RecordingSink::default();
    let tracks: Vec<TrackRecord> = (1..=5).map(|id| track(id, &format!("Track {id}"))).collect();

    let report = downloader.download_all(&tracks, &sink).unwrap();

    assert_eq!(report.entries[4], "05 - Adi 55 - Track 5.mp3");
    let saved = saver.saved.lock().unwrap();
    let names: Vec<String> = entry_names(&saved[0].1).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, report.entries);
    assert_eq!(*sink.percents.lock().unwrap(), vec![0, 20, 40, 60, 80, 100]);
}

struct BlockingFetcher {
    started: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl AssetFetcher for BlockingFetcher {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, CatalogError> {
        self.started.lock().unwrap().send(()).ok();
        self.release.lock().unwrap().recv().ok();
        Ok(b"audio".to_vec())
    }
}

#[test]
fn second_bulk_download_is_rejected() {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let downloader = Arc::new(BulkDownloader::new(
        BlockingFetcher {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        },
        MemorySave::default(),
        ARCHIVE,
        1,
    ));

    let worker = {
        let downloader = Arc::clone(&downloader);
        thread::spawn(move || {
            downloader.download_all(&[track(1, "CEO Bars")], &RecordingSink::default())
        })
    };

    started_rx.recv().unwrap();
    assert!(downloader.is_bulk_in_progress());
    let err = downloader
        .download_all(&catalog(), &RecordingSink::default())
        .unwrap_err();
    assert_matches!(err, CatalogError::BulkInProgress);

    release_tx.send(()).unwrap();
    assert!(worker.join().unwrap().is_ok());
    assert!(!downloader.is_bulk_in_progress());
}

#[test]
fn single_download_saves_under_display_name() {
    let saver = MemorySave::default();
    let downloader = BulkDownloader::new(MockFetcher::default(), saver.clone(), ARCHIVE, 1);
    let sink = RecordingSink::default();

    let report = downloader.download_one(&track(2, "Zen Flow"), &sink).unwrap();

    assert_eq!(report.file_name, "Adi 55 - Zen Flow.mp3");
    assert_eq!(saver.saved.lock().unwrap()[0].1, b"audio:https://cdn/2/master.mp3");
    let toasts = sink.toasts.lock().unwrap();
    assert_eq!(toasts[0], Toast::loading("Downloading \"Zen Flow\"..."));
    assert_eq!(toasts[1], Toast::success("\"Zen Flow\" downloaded!"));
    assert!(!downloader.is_downloading(2));
}

#[test]
fn single_download_error_status_is_not_saved() {
    let fetcher = MockFetcher {
        failing: HashMap::from([("https://cdn/3/master.mp3".to_string(), 500)]),
        ..MockFetcher::default()
    };
    let saver = MemorySave::default();
    let downloader = BulkDownloader::new(fetcher, saver.clone(), ARCHIVE, 1);
    let sink = RecordingSink::default();

    let err = downloader
        .download_one(&track(3, "Street Theory"), &sink)
        .unwrap_err();

    assert_matches!(err, CatalogError::FetchStatus { status: 500, .. });
    assert!(saver.saved.lock().unwrap().is_empty());
    assert_eq!(
        sink.toasts.lock().unwrap().last().and_then(Toast::kind),
        Some(ToastKind::Error)
    );
}
