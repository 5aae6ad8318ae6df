//! Device and encoder discovery through GStreamer.

use gst::prelude::*;
use gstreamer as gst;

use vidgrab_common::error::{VidgrabError, VidgrabResult};

use crate::pipeline::init_gstreamer;
use crate::{CodecInfo, DeviceInfo, DeviceKind};

/// Device name selecting the platform default source.
pub const AUTO_DEVICE: &str = "auto";
/// Device name selecting a synthetic source.
pub const TEST_DEVICE: &str = "test";

/// Properties that carry a device node, in order of preference.
const DEVICE_PATH_KEYS: [&str; 3] = ["device.path", "api.v4l2.path", "object.path"];

impl DeviceKind {
    fn monitor_class(&self) -> &'static str {
        match self {
            DeviceKind::Video => "Video/Source",
            DeviceKind::Audio => "Audio/Source",
        }
    }

    fn auto_factory(&self) -> &'static str {
        match self {
            DeviceKind::Video => "autovideosrc",
            DeviceKind::Audio => "autoaudiosrc",
        }
    }

    fn test_factory(&self) -> &'static str {
        match self {
            DeviceKind::Video => "videotestsrc",
            DeviceKind::Audio => "audiotestsrc",
        }
    }
}

/// Where a pipeline's source element comes from.
#[derive(Debug)]
pub enum SourceSelection {
    Auto,
    Test,
    Device(gst::Device),
}

impl SourceSelection {
    /// Create the source element for `kind`.
    pub fn create_element(&self, kind: DeviceKind) -> VidgrabResult<gst::Element> {
        match self {
            SourceSelection::Auto => gst::ElementFactory::make(kind.auto_factory())
                .build()
                .map_err(|e| {
                    VidgrabError::device(format!("Failed to create {}: {e}", kind.auto_factory()))
                }),
            SourceSelection::Test => gst::ElementFactory::make(kind.test_factory())
                .property("is-live", true)
                .build()
                .map_err(|e| {
                    VidgrabError::device(format!("Failed to create {}: {e}", kind.test_factory()))
                }),
            SourceSelection::Device(device) => device.create_element(None).map_err(|e| {
                VidgrabError::device(format!(
                    "Failed to open device '{}': {e}",
                    device.display_name()
                ))
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceSelection::Auto => AUTO_DEVICE.to_string(),
            SourceSelection::Test => TEST_DEVICE.to_string(),
            SourceSelection::Device(device) => device.display_name().to_string(),
        }
    }
}

/// Enumerate capture devices of `kind` with GStreamer's device monitor.
pub fn list_devices(kind: DeviceKind) -> VidgrabResult<Vec<DeviceInfo>> {
    Ok(probe_devices(kind)?
        .iter()
        .map(|device| device_info(device, kind))
        .collect())
}

/// Enumerate encoders able to produce `kind` streams.
pub fn list_codecs(kind: DeviceKind) -> VidgrabResult<Vec<CodecInfo>> {
    init_gstreamer()?;

    let factory_type = match kind {
        DeviceKind::Video => gst::ElementFactoryType::VIDEO_ENCODER,
        DeviceKind::Audio => gst::ElementFactoryType::AUDIO_ENCODER,
    };

    let mut codecs: Vec<CodecInfo> =
        gst::ElementFactory::factories_with_type(factory_type, gst::Rank::NONE)
            .iter()
            .map(|factory| CodecInfo {
                name: factory.name().to_string(),
                description: factory.longname().to_string(),
            })
            .collect();
    codecs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(codecs)
}

/// Whether an element with this factory name is installed.
pub fn element_available(name: &str) -> bool {
    init_gstreamer().is_ok() && gst::ElementFactory::find(name).is_some()
}

/// Turn a configured device name into a source.
///
/// Unknown names fall back to [`SourceSelection::Auto`] with a warning.
pub fn resolve_source(kind: DeviceKind, requested: &str) -> VidgrabResult<SourceSelection> {
    let requested = requested.trim();
    if requested.is_empty() || requested.eq_ignore_ascii_case(AUTO_DEVICE) {
        return Ok(SourceSelection::Auto);
    }
    if requested.eq_ignore_ascii_case(TEST_DEVICE) {
        return Ok(SourceSelection::Test);
    }

    let devices = probe_devices(kind)?;
    let names: Vec<String> = devices
        .iter()
        .map(|device| device.display_name().to_string())
        .collect();

    match match_device_name(&names, requested) {
        Some(index) => {
            tracing::info!(?kind, device = %names[index], "Selected capture device");
            Ok(SourceSelection::Device(devices[index].clone()))
        }
        None => {
            tracing::warn!(
                ?kind,
                requested,
                available = %names.join(", "),
                "Requested device not found; using the default source"
            );
            Ok(SourceSelection::Auto)
        }
    }
}

/// Find `wanted` among device names: exact match first, then a
/// case-insensitive substring match.
pub fn match_device_name(names: &[String], wanted: &str) -> Option<usize> {
    if let Some(index) = names.iter().position(|name| name == wanted) {
        return Some(index);
    }
    let wanted = wanted.to_lowercase();
    names
        .iter()
        .position(|name| name.to_lowercase().contains(&wanted))
}

fn probe_devices(kind: DeviceKind) -> VidgrabResult<Vec<gst::Device>> {
    init_gstreamer()?;

    let monitor = gst::DeviceMonitor::new();
    monitor.add_filter(Some(kind.monitor_class()), None);
    monitor
        .start()
        .map_err(|e| VidgrabError::device(format!("Failed to start device monitor: {e}")))?;

    let devices: Vec<gst::Device> = monitor
        .devices()
        .into_iter()
        .filter(|device| device.device_class().contains(kind.monitor_class()))
        .collect();

    monitor.stop();
    tracing::debug!(?kind, count = devices.len(), "Device probe finished");
    Ok(devices)
}

fn device_info(device: &gst::Device, kind: DeviceKind) -> DeviceInfo {
    let path = device.properties().and_then(|props| {
        DEVICE_PATH_KEYS
            .iter()
            .find_map(|key| props.get::<String>(*key).ok())
    });

    DeviceInfo {
        name: device.display_name().to_string(),
        kind,
        class: device.device_class().to_string(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_name_wins_over_substring() {
        let devices = names(&["USB Camera HD", "USB Camera"]);
        assert_eq!(match_device_name(&devices, "USB Camera"), Some(1));
    }

    #[test]
    fn substring_match_ignores_case() {
        let devices = names(&["Integrated Webcam", "Logitech BRIO"]);
        assert_eq!(match_device_name(&devices, "brio"), Some(1));
    }

    #[test]
    fn unknown_name_has_no_match() {
        let devices = names(&["Integrated Webcam"]);
        assert_eq!(match_device_name(&devices, "Built-in iSight"), None);
        assert_eq!(match_device_name(&[], "anything"), None);
    }

    #[test]
    fn reserved_names_skip_probing() {
        assert!(matches!(
            resolve_source(DeviceKind::Video, "auto").unwrap(),
            SourceSelection::Auto
        ));
        assert!(matches!(
            resolve_source(DeviceKind::Audio, " TEST ").unwrap(),
            SourceSelection::Test
        ));
        assert!(matches!(
            resolve_source(DeviceKind::Video, "").unwrap(),
            SourceSelection::Auto
        ));
    }
}
