//! Device classification that gates which effects run and at what quality.

use lumenrain_platform::Viewport;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CapabilityConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityState {
    pub is_constrained_device: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityTier {
    Full,
    /// Rain at lowered opacity, no canvas particle work.
    Reduced,
}

impl CapabilityState {
    pub fn tier(&self) -> QualityTier {
        if self.is_constrained_device {
            QualityTier::Reduced
        } else {
            QualityTier::Full
        }
    }
}

/// Classifies a runtime from its viewport width and user-agent. A missing
/// user-agent never marks the device as mobile.
pub fn evaluate(
    config: &CapabilityConfig,
    viewport_width: f32,
    user_agent: Option<&str>,
) -> CapabilityState {
    let narrow = viewport_width < config.narrow_viewport_px;
    let mobile = user_agent
        .map(|ua| is_mobile_user_agent(&config.mobile_signatures, ua))
        .unwrap_or(false);
    CapabilityState {
        is_constrained_device: narrow || mobile,
    }
}

pub fn is_mobile_user_agent(signatures: &[String], user_agent: &str) -> bool {
    let user_agent = user_agent.to_ascii_lowercase();
    signatures
        .iter()
        .any(|signature| user_agent.contains(&signature.to_ascii_lowercase()))
}

/// Holds the latest classification for one mounted host.
#[derive(Debug, Clone)]
pub struct CapabilityProbe {
    config: CapabilityConfig,
    state: CapabilityState,
}

impl CapabilityProbe {
    pub fn new(config: CapabilityConfig) -> Self {
        Self {
            config,
            state: CapabilityState::default(),
        }
    }

    pub fn state(&self) -> CapabilityState {
        self.state
    }

    /// Re-reads the viewport and stores the new classification.
    pub fn evaluate(&mut self, viewport: &dyn Viewport) -> CapabilityState {
        let size = viewport.size();
        let user_agent = viewport.user_agent();
        let next = evaluate(&self.config, size.width, user_agent.as_deref());
        if next != self.state {
            info!(
                width = size.width,
                tier = ?next.tier(),
                "capability changed"
            );
        }
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumenrain_platform::headless::HeadlessViewport;
    use lumenrain_platform::ViewportSize;

    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
    const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36";

    #[test]
    fn narrow_viewport_is_constrained() {
        let config = CapabilityConfig::default();
        assert!(evaluate(&config, 767.0, Some(DESKTOP_UA)).is_constrained_device);
        assert!(!evaluate(&config, 768.0, Some(DESKTOP_UA)).is_constrained_device);
    }

    #[test]
    fn mobile_user_agent_is_constrained_at_any_width() {
        let config = CapabilityConfig::default();
        let state = evaluate(&config, 1920.0, Some(IPHONE_UA));
        assert!(state.is_constrained_device);
        assert_eq!(state.tier(), QualityTier::Reduced);
    }

    #[test]
    fn missing_user_agent_defaults_to_unconstrained() {
        let config = CapabilityConfig::default();
        assert_eq!(evaluate(&config, 1280.0, None).tier(), QualityTier::Full);
    }

    #[test]
    fn signature_match_ignores_case() {
        let signatures = vec!["Android".to_string()];
        assert!(is_mobile_user_agent(&signatures, "Mozilla/5.0 (Linux; ANDROID 14)"));
        assert!(!is_mobile_user_agent(&signatures, DESKTOP_UA));
    }

    #[test]
    fn probe_tracks_viewport_changes() {
        let viewport = HeadlessViewport::new(ViewportSize::new(1440.0, 900.0), Some(DESKTOP_UA));
        let mut probe = CapabilityProbe::new(CapabilityConfig::default());
        assert!(!probe.evaluate(&viewport).is_constrained_device);
        viewport.resize(ViewportSize::new(500.0, 900.0));
        assert!(probe.evaluate(&viewport).is_constrained_device);
        assert!(probe.state().is_constrained_device);
    }
}
