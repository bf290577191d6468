use crate::device::DeviceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which of a camera's streams a `CameraStream` row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Main,
    Sub,
}

/// A single RTSP (or other) stream URL belonging to a Camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraStream {
    pub id: i64,
    pub camera_id: i64,
    pub kind: StreamKind,
    pub url: String,
}

/// A camera attached to a Device. `snapshot_url`, when present, takes
/// priority over any RTSP stream for the HTTP snapshot path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub id: i64,
    pub device_id: i64,
    pub snapshot_url: Option<String>,
    pub default_stream_id: Option<i64>,
    pub status: DeviceStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// An image source resolved for a single snapshot attempt, in the priority
/// order mandated for the Camera Manager: explicit HTTP URL, default RTSP
/// stream, any `sub` stream, any `main` stream.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Http(String),
    Rtsp(String),
}

impl Camera {
    pub fn resolve_source(&self, streams: &[CameraStream]) -> Option<ImageSource> {
        if let Some(url) = &self.snapshot_url {
            return Some(ImageSource::Http(url.clone()));
        }
        if let Some(default_id) = self.default_stream_id {
            if let Some(stream) = streams.iter().find(|s| s.id == default_id) {
                return Some(ImageSource::Rtsp(stream.url.clone()));
            }
        }
        streams
            .iter()
            .find(|s| s.kind == StreamKind::Sub)
            .or_else(|| streams.iter().find(|s| s.kind == StreamKind::Main))
            .map(|s| ImageSource::Rtsp(s.url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: i64, kind: StreamKind) -> CameraStream {
        CameraStream {
            id,
            camera_id: 1,
            kind,
            url: format!("rtsp://cam/{id}"),
        }
    }

    #[test]
    fn explicit_http_url_wins_over_streams() {
        let camera = Camera {
            id: 1,
            device_id: 1,
            snapshot_url: Some("http://cam/snapshot.jpg".into()),
            default_stream_id: Some(1),
            status: DeviceStatus::Online,
            last_heartbeat: None,
            username: None,
            password: None,
        };
        let streams = vec![stream(1, StreamKind::Main)];
        match camera.resolve_source(&streams) {
            Some(ImageSource::Http(url)) => assert_eq!(url, "http://cam/snapshot.jpg"),
            other => panic!("expected Http source, got {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_sub_then_main_stream() {
        let camera = Camera {
            id: 1,
            device_id: 1,
            snapshot_url: None,
            default_stream_id: None,
            status: DeviceStatus::Online,
            last_heartbeat: None,
            username: None,
            password: None,
        };
        let streams = vec![stream(1, StreamKind::Main), stream(2, StreamKind::Sub)];
        match camera.resolve_source(&streams) {
            Some(ImageSource::Rtsp(url)) => assert_eq!(url, "rtsp://cam/2"),
            other => panic!("expected sub stream, got {other:?}"),
        }
    }
}
