use serde::{Deserialize, Serialize};
use std::fmt;

/// Viewports at least this wide (in CSS pixels) are tablets.
pub const TABLET_MIN_WIDTH: u32 = 768;
/// Viewports at least this wide (in CSS pixels) are desktops.
pub const DESKTOP_MIN_WIDTH: u32 = 1024;

/// Device class, decided once per session from the viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    Desktop,
}

impl Device {
    #[must_use]
    pub fn from_viewport_width(width: u32) -> Self {
        if width < TABLET_MIN_WIDTH {
            Device::Mobile
        } else if width < DESKTOP_MIN_WIDTH {
            Device::Tablet
        } else {
            Device::Desktop
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
            Device::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
