use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    BackendError, GenerateRequest, GenerateResponse, GenerativeBackend, ImageRequest,
};
use crate::db::models::InlineImage;

/// Backend that replays queued text replies and records every request.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    image_calls: AtomicUsize,
    images_fail: bool,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, err: BackendError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn failing_images(mut self) -> Self {
        self.images_fail = true;
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, BackendError> {
        self.requests.lock().unwrap().push(request);
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(BackendError::EmptyResponse));
        next.map(|text| GenerateResponse {
            text,
            sources: Vec::new(),
        })
    }

    async fn generate_image(&self, _request: ImageRequest) -> Result<InlineImage, BackendError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.images_fail {
            Err(BackendError::Timeout)
        } else {
            Ok(InlineImage::new("image/jpeg", vec![0xff, 0xd8, 0xff]))
        }
    }
}
