//! Media dispatcher
//!
//! Routes each dequeued job to the processor for its MIME type. Jobs for the
//! same media id never run concurrently, and jobs for records that are
//! already completed (or no longer exist) are skipped.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use vault_core::models::ProcessingJob;
use vault_db::MediaStore;
use vault_worker::JobHandler;

use crate::image::ImageProcessor;
use crate::video::VideoFrameExtractor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRoute {
    Image,
    /// Videos and GIFs, processed through their first frame.
    VideoFrame,
}

/// Pick the processor for a MIME type. Case-insensitive; parameters such as
/// `; charset=...` are ignored.
pub fn route(mime: &str) -> Option<MediaRoute> {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "image/gif" || essence.starts_with("video/") {
        Some(MediaRoute::VideoFrame)
    } else if essence.starts_with("image/") {
        Some(MediaRoute::Image)
    } else {
        None
    }
}

/// Removes its id from the in-flight set when dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<Uuid>>>, id: Uuid) -> Option<Self> {
        let mut ids = set.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.insert(id).then(|| Self {
            set: set.clone(),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut ids = self
            .set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ids.remove(&self.id);
    }
}

pub struct MediaDispatcher {
    store: MediaStore,
    images: Arc<ImageProcessor>,
    videos: Arc<VideoFrameExtractor>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl MediaDispatcher {
    pub fn new(
        store: MediaStore,
        images: Arc<ImageProcessor>,
        videos: Arc<VideoFrameExtractor>,
    ) -> Self {
        Self {
            store,
            images,
            videos,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

#[async_trait]
impl JobHandler for MediaDispatcher {
    #[tracing::instrument(skip(self, job), fields(media.id = %job.id, job.mime = %job.mime_type))]
    async fn handle(&self, job: ProcessingJob) -> Result<()> {
        let Some(media_route) = route(&job.mime_type) else {
            tracing::warn!("Unsupported MIME type, dropping job");
            return Ok(());
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, job.id) else {
            tracing::info!("Job for this media is already running, skipping");
            return Ok(());
        };

        match self.store.get(job.id).await? {
            None => {
                tracing::warn!("Media record not found, skipping job");
                return Ok(());
            }
            Some(record) if record.is_completed() => {
                tracing::info!("Media already processed, skipping job");
                return Ok(());
            }
            Some(_) => {}
        }

        match media_route {
            MediaRoute::Image => self.images.process(job.id, &job.path).await?,
            MediaRoute::VideoFrame => self.videos.process(job.id, &job.path).await?,
        };
        Ok(())
    }
}
