use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::TrackRecord;
use crate::error::CatalogError;
use crate::fetch::AssetFetcher;
use crate::fs_util::validate_zip_bytes;
use crate::notify::Toast;
use crate::save::SaveTarget;

pub const BULK_SUCCESS: &str = "Download complete!";
pub const DOWNLOAD_FAILURE: &str = "Download failed. Please try again.";

#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub archive_name: String,
    pub saved_to: String,
    pub entries: Vec<String>,
    pub bytes: usize,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleReport {
    pub id: u64,
    pub title: String,
    pub file_name: String,
    pub saved_to: String,
    pub bytes: usize,
}

/// Archive entry name: `"<index, at least two digits> - <artist> - <title>.mp3"`.
pub fn archive_entry_name(position: usize, track: &TrackRecord) -> String {
    let name = format!("{position:02} - {} - {}.mp3", track.artist, track.title);
    name.replace(['/', '\\'], "_")
}

pub fn single_file_name(track: &TrackRecord) -> String {
    format!("{} - {}.mp3", track.artist, track.title)
}

/// Integer percentage of `completed` out of `total`, rounded half up.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total);
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Fetches catalog assets and hands finished downloads to a [`SaveTarget`].
///
/// One bulk download may run at a time; a second `download_all` while one is
/// active fails with [`CatalogError::BulkInProgress`]. Single downloads do
/// not touch the bulk state.
pub struct BulkDownloader<F: AssetFetcher, S: SaveTarget> {
    fetcher: F,
    saver: S,
    archive_name: String,
    concurrency: usize,
    in_progress: AtomicBool,
    progress: AtomicU8,
    active_singles: Mutex<Vec<u64>>,
}

struct BulkGuard<'a> {
    in_progress: &'a AtomicBool,
    progress: &'a AtomicU8,
}

impl Drop for BulkGuard<'_> {
    fn drop(&mut self) {
        self.progress.store(0, Ordering::SeqCst);
        self.in_progress.store(false, Ordering::SeqCst);
    }
}

struct SingleGuard<'a> {
    active: &'a Mutex<Vec<u64>>,
    id: u64,
}

impl Drop for SingleGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(pos) = active.iter().position(|id| *id == self.id) {
                active.remove(pos);
            }
        }
    }
}

impl<F: AssetFetcher, S: SaveTarget> BulkDownloader<F, S> {
    pub fn new(fetcher: F, saver: S, archive_name: impl Into<String>, concurrency: usize) -> Self {
        Self {
            fetcher,
            saver,
            archive_name: archive_name.into(),
            concurrency: concurrency.max(1),
            in_progress: AtomicBool::new(false),
            progress: AtomicU8::new(0),
            active_singles: Mutex::new(Vec::new()),
        }
    }

    pub fn is_bulk_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Last reported bulk percentage; 0 when no bulk download is running.
    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn is_downloading(&self, id: u64) -> bool {
        self.active_singles
            .lock()
            .map(|active| active.contains(&id))
            .unwrap_or(false)
    }

    /// Fetches every track in order into one archive and saves it. Nothing is
    /// saved unless every fetch and the archive finalization succeed.
    pub fn download_all(
        &self,
        tracks: &[TrackRecord],
        sink: &dyn ProgressSink,
    ) -> Result<BulkReport, CatalogError> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CatalogError::BulkInProgress);
        }
        let _guard = BulkGuard {
            in_progress: &self.in_progress,
            progress: &self.progress,
        };

        let started = Instant::now();
        self.progress.store(0, Ordering::SeqCst);
        sink.event(ProgressEvent::progress(
            format!("Downloading {} tracks", tracks.len()),
            0,
        ));

        match self.build_and_save(tracks, sink, started) {
            Ok(report) => {
                info!(
                    entries = report.entries.len(),
                    bytes = report.bytes,
                    saved_to = %report.saved_to,
                    "archive saved"
                );
                sink.notify(&Toast::success(BULK_SUCCESS));
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "bulk download failed");
                sink.notify(&Toast::error(DOWNLOAD_FAILURE));
                Err(err)
            }
        }
    }

    fn build_and_save(
        &self,
        tracks: &[TrackRecord],
        sink: &dyn ProgressSink,
        started: Instant,
    ) -> Result<BulkReport, CatalogError> {
        let total = tracks.len();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut entries = Vec::with_capacity(total);

        for (chunk_index, batch) in tracks.chunks(self.concurrency).enumerate() {
            let offset = chunk_index * self.concurrency;
            for (within, result) in self.fetch_batch(batch).into_iter().enumerate() {
                let index = offset + within;
                let track = &tracks[index];
                let bytes = result?;
                let entry_name = archive_entry_name(index + 1, track);
                zip.start_file(entry_name.as_str(), options)
                    .map_err(|err| CatalogError::ArchiveFinalization(err.to_string()))?;
                zip.write_all(&bytes)
                    .map_err(|err| CatalogError::ArchiveFinalization(err.to_string()))?;

                let percent = progress_percent(index + 1, total);
                self.progress.store(percent, Ordering::SeqCst);
                sink.event(ProgressEvent {
                    message: format!("Added {entry_name}"),
                    percent: Some(percent),
                    elapsed: Some(started.elapsed()),
                });
                entries.push(entry_name);
            }
        }

        sink.event(ProgressEvent::new("Finalizing archive"));
        let bytes = zip
            .finish()
            .map_err(|err| CatalogError::ArchiveFinalization(err.to_string()))?
            .into_inner();
        validate_zip_bytes(&bytes)?;

        let saved_to = self.saver.save(&self.archive_name, &bytes)?;
        Ok(BulkReport {
            archive_name: self.archive_name.clone(),
            saved_to: saved_to.to_string(),
            entries,
            bytes: bytes.len(),
            elapsed_ms: started.elapsed().as_millis(),
        })
    }

    /// Results come back in `batch` order regardless of completion order.
    fn fetch_batch(&self, batch: &[TrackRecord]) -> Vec<Result<Vec<u8>, CatalogError>> {
        if batch.len() == 1 {
            return vec![self.fetcher.fetch(&batch[0].file)];
        }
        let fetcher = &self.fetcher;
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|track| scope.spawn(move || fetcher.fetch(&track.file)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(CatalogError::ArchiveFinalization(
                            "fetch worker panicked".to_string(),
                        ))
                    })
                })
                .collect()
        })
    }

    /// Fetches one track and saves it as `"<artist> - <title>.mp3"`.
    pub fn download_one(
        &self,
        track: &TrackRecord,
        sink: &dyn ProgressSink,
    ) -> Result<SingleReport, CatalogError> {
        if let Ok(mut active) = self.active_singles.lock() {
            active.push(track.id);
        }
        let _guard = SingleGuard {
            active: &self.active_singles,
            id: track.id,
        };

        sink.notify(&Toast::loading(format!("Downloading \"{}\"...", track.title)));
        let result = self.fetcher.fetch(&track.file).and_then(|bytes| {
            let file_name = single_file_name(track);
            let saved_to = self.saver.save(&file_name, &bytes)?;
            Ok(SingleReport {
                id: track.id,
                title: track.title.clone(),
                file_name,
                saved_to: saved_to.to_string(),
                bytes: bytes.len(),
            })
        });

        match result {
            Ok(report) => {
                sink.notify(&Toast::success(format!("\"{}\" downloaded!", track.title)));
                Ok(report)
            }
            Err(err) => {
                warn!(id = track.id, error = %err, "single download failed");
                sink.notify(&Toast::error(DOWNLOAD_FAILURE));
                Err(err)
            }
        }
    }
}
