//! profile::mock
//!
//! Mock profile service for deterministic testing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{ExtendedProfile, ProfileClient, ProfileError};
use crate::session::AvatarRef;

/// Mock profile service. Clones share state.
#[derive(Debug, Clone)]
pub struct MockProfile {
    inner: Arc<Mutex<MockProfileInner>>,
}

#[derive(Debug)]
struct MockProfileInner {
    profile: Result<ExtendedProfile, ProfileError>,
    avatar: Result<Option<AvatarRef>, ProfileError>,
    avatar_delay: Option<Duration>,
    profile_calls: usize,
    avatar_calls: usize,
}

impl Default for MockProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProfile {
    /// Empty profile, no photo.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockProfileInner {
                profile: Ok(ExtendedProfile::default()),
                avatar: Ok(None),
                avatar_delay: None,
                profile_calls: 0,
                avatar_calls: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockProfileInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_profile(self, profile: ExtendedProfile) -> Self {
        self.lock().profile = Ok(profile);
        self
    }

    pub fn fail_profile(self, err: ProfileError) -> Self {
        self.lock().profile = Err(err);
        self
    }

    pub fn with_avatar(self, avatar: AvatarRef) -> Self {
        self.lock().avatar = Ok(Some(avatar));
        self
    }

    pub fn fail_avatar(self, err: ProfileError) -> Self {
        self.lock().avatar = Err(err);
        self
    }

    /// Delay every avatar answer.
    pub fn with_avatar_delay(self, delay: Duration) -> Self {
        self.lock().avatar_delay = Some(delay);
        self
    }

    pub fn profile_calls(&self) -> usize {
        self.lock().profile_calls
    }

    pub fn avatar_calls(&self) -> usize {
        self.lock().avatar_calls
    }
}

#[async_trait]
impl ProfileClient for MockProfile {
    async fn fetch_profile(&self, _access_token: &str) -> Result<ExtendedProfile, ProfileError> {
        let mut inner = self.lock();
        inner.profile_calls += 1;
        inner.profile.clone()
    }

    async fn fetch_avatar(&self, _access_token: &str) -> Result<Option<AvatarRef>, ProfileError> {
        let (delay, result) = {
            let mut inner = self.lock();
            inner.avatar_calls += 1;
            (inner.avatar_delay, inner.avatar.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
