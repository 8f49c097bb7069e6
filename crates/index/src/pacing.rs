use std::time::Duration;
use tokio::time::sleep;

/// Delay inserted between external calls to stay under provider rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    Disabled,
    Fixed(Duration),
}

impl Pacing {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::Disabled
        } else {
            Self::Fixed(Duration::from_millis(ms))
        }
    }

    pub async fn wait(&self) {
        if let Self::Fixed(delay) = self {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing");
            sleep(*delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        assert_eq!(Pacing::from_millis(0), Pacing::Disabled);
        assert_eq!(
            Pacing::from_millis(2000),
            Pacing::Fixed(Duration::from_secs(2))
        );
    }
}
