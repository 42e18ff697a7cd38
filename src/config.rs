//! Build-time configuration.
//!
//! Board addresses are chosen by Cargo feature (see the crate root); the
//! tunables below are the knobs the kernel entry point reads.

use log::LevelFilter;

use crate::framebuffer::DisplayMode;

/// Preferred display mode
pub const PREFERRED_MODE: DisplayMode = DisplayMode::new(1920, 1080);

/// Used when firmware refuses the preferred mode
pub const FALLBACK_MODE: DisplayMode = DisplayMode::new(1280, 720);

/// Modes tried in order at start-up
pub const DISPLAY_MODES: [DisplayMode; 2] = [PREFERRED_MODE, FALLBACK_MODE];

/// Status polls per mailbox wait before reporting a timeout
pub const MAILBOX_SPIN_LIMIT: u32 = crate::mailbox::DEFAULT_SPIN_LIMIT;

/// Console baud rate
pub const UART_BAUD: u32 = 115_200;

/// ECU link baud rate when UART0 carries MegaSquirt traffic
pub const ECU_BAUD: u32 = 115_200;

/// PL011 reference clock on the default firmware configuration
pub const UART_CLOCK_HZ: u32 = 48_000_000;

/// Most verbose level the console logger emits
pub const LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Nominal time between frames, fed to the telemetry simulation
pub const FRAME_MS: u32 = 50;

/// Busy-wait iterations approximating [`FRAME_MS`]
pub const FRAME_DELAY_SPINS: u32 = 1_000_000;

/// Name shown for the built-in demo dashboard
pub const DEMO_DASHBOARD_NAME: &str = "LibreDash Demo";
