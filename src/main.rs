//! # LibreDash kernel
//!
//! Entered from the boot stub at `kernel_main` with the MMU off and one
//! core running. Brings up the console, negotiates a framebuffer and
//! renders the demo dashboard forever.
//!
//! With the `megasquirt` feature UART0 talks to the ECU instead of the
//! console, and the simulator only runs if the ECU never answers.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use log::{error, info, warn};

use libredash::demo::{apply_sample, demo_dashboard};
use libredash::framebuffer::negotiate_with_fallback;
#[cfg(feature = "megasquirt")]
use libredash::ecu::MegaSquirt;
use libredash::telemetry::{EngineSample, SimulatedEcu};
use libredash::uart::Uart;
use libredash::{config, Framebuffer, Mailbox, Mmio, GPIO_BASE, MAILBOX_BASE, PROPERTY_BUFFER, UART0_BASE};

#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    // Identity-mapped device memory, nothing else touches these registers
    let bus = unsafe { Mmio::new() };

    let mut feed = start_feed(Uart::new(bus, UART0_BASE));
    info!("LibreDash starting");

    let mailbox = Mailbox::new(bus, MAILBOX_BASE).with_spin_limit(config::MAILBOX_SPIN_LIMIT);

    let info = {
        let buffer = PROPERTY_BUFFER.lock();

        match mailbox.firmware_revision(&buffer) {
            Ok(rev) => info!("firmware revision {:#010x}", rev),
            Err(e) => warn!("firmware revision unavailable: {}", e),
        }
        match mailbox.board_revision(&buffer) {
            Ok(rev) => info!("board revision {:#010x}", rev),
            Err(e) => warn!("board revision unavailable: {}", e),
        }

        negotiate_with_fallback(&mailbox, &buffer, &config::DISPLAY_MODES)
    };
    let info = match info {
        Ok(info) => info,
        Err(e) => {
            error!("{}", e);
            halt();
        }
    };

    // Negotiated just above; this is the only handle to the buffer
    let mut fb = unsafe { Framebuffer::from_info(info) };

    let mut dash = match demo_dashboard() {
        Ok(dash) => dash,
        Err(e) => {
            error!("demo dashboard: {}", e);
            halt();
        }
    };
    info!("rendering '{}' ({} elements)", dash.name(), dash.len());

    loop {
        let sample = feed.next_sample();
        if let Err(e) = apply_sample(&mut dash, &sample) {
            warn!("telemetry update: {}", e);
        }
        dash.render(&mut fb);
        delay(config::FRAME_DELAY_SPINS);
    }
}

/// Where each frame's engine readings come from
enum Feed {
    Simulated(SimulatedEcu),
    #[cfg(feature = "megasquirt")]
    Live(MegaSquirt, EngineSample),
}

impl Feed {
    fn next_sample(&mut self) -> EngineSample {
        match self {
            Feed::Simulated(sim) => sim.advance(config::FRAME_MS),
            #[cfg(feature = "megasquirt")]
            Feed::Live(link, last) => {
                match link.poll() {
                    Ok(_) => link.apply_to(last),
                    Err(e) => warn!("ECU poll: {}", e),
                }
                *last
            }
        }
    }
}

#[cfg(not(feature = "megasquirt"))]
fn start_feed(mut uart: Uart) -> Feed {
    if uart.init(GPIO_BASE, config::UART_CLOCK_HZ, config::UART_BAUD).is_ok() {
        let _ = libredash::logger::init(uart, config::LOG_LEVEL);
    }
    Feed::Simulated(SimulatedEcu::new())
}

// No console in this build: UART0 is the ECU line
#[cfg(feature = "megasquirt")]
fn start_feed(mut uart: Uart) -> Feed {
    if uart.init(GPIO_BASE, config::UART_CLOCK_HZ, config::ECU_BAUD).is_err() {
        return Feed::Simulated(SimulatedEcu::new());
    }
    let mut link = MegaSquirt::new(uart);
    match link.connect() {
        Ok(_) => Feed::Live(link, SimulatedEcu::new().sample()),
        Err(_) => Feed::Simulated(SimulatedEcu::new()),
    }
}

fn delay(spins: u32) {
    for _ in 0..spins {
        core::hint::spin_loop();
    }
}

fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("panic: {}", info);
    halt()
}
