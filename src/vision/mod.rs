//! Perception collaborator boundary
//!
//! The vision service itself is external; this module holds the shared
//! snapshot it refreshes and the VisionAssist flag that tells it whether
//! sampling should be active. Reads are best-effort and possibly stale.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One detected object in the latest analysis
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f32,
}

/// A snapshot of the latest image analysis
#[derive(Debug, Clone, Default)]
pub struct SceneAnalysis {
    pub objects: Vec<DetectedObject>,
    pub people: u32,
    pub description: String,
    pub tags: Vec<String>,
}

/// Shared handle between the executor and the perception collaborator
#[derive(Debug, Default)]
pub struct VisionFeed {
    assist: AtomicBool,
    latest: Mutex<Option<SceneAnalysis>>,
}

impl VisionFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether perception sampling should currently be active
    pub fn assist_enabled(&self) -> bool {
        self.assist.load(Ordering::SeqCst)
    }

    pub fn set_assist(&self, enabled: bool) {
        self.assist.store(enabled, Ordering::SeqCst);
    }

    /// Called by the perception collaborator whenever a new analysis is
    /// available
    pub fn update(&self, analysis: SceneAnalysis) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(analysis);
    }

    /// The latest analysis, possibly stale, possibly absent
    pub fn snapshot(&self) -> Option<SceneAnalysis> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assist_flag_roundtrip() {
        let feed = VisionFeed::new();
        assert!(!feed.assist_enabled());
        feed.set_assist(true);
        assert!(feed.assist_enabled());
        feed.set_assist(false);
        assert!(!feed.assist_enabled());
    }

    #[test]
    fn test_snapshot_replaces_previous() {
        let feed = VisionFeed::new();
        assert!(feed.snapshot().is_none());

        feed.update(SceneAnalysis {
            objects: vec![DetectedObject {
                label: "chair".into(),
                confidence: 0.9,
            }],
            ..Default::default()
        });
        feed.update(SceneAnalysis {
            objects: vec![DetectedObject {
                label: "person".into(),
                confidence: 0.8,
            }],
            ..Default::default()
        });

        let latest = feed.snapshot().unwrap();
        assert_eq!(latest.objects.len(), 1);
        assert_eq!(latest.objects[0].label, "person");
    }
}
