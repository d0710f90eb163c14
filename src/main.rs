// SPDX-License-Identifier: Apache-2.0

//! bpSure monitor firmware entry point.
//!
//! Brings up the board, hands the tick hardware to the timer interrupt, then services the serial
//! link forever.
#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![doc(html_playground_url = "https://play.rust-lang.org/")]
#![warn(missing_docs)]

#[cfg(target_os = "none")]
mod firmware {
    use bpsure_monitor::{
        acquisition::SensorBus,
        components::{Board, PanelLed},
        config::HARDWARE_WAIT,
        display::{render_banner, CharacterOled},
        interrupt::{toggle_state, BOARD},
        serial::SerialLink,
    };
    use cortex_m::singleton;
    use defmt::{debug, info, warn};
    #[allow(unused_imports)]
    use defmt_rtt as _;
    use embedded_hal::spi::MODE_0;
    #[allow(unused_imports)]
    use panic_probe as _;
    use rp2040_hal::{
        clocks::init_clocks_and_plls,
        entry,
        fugit::RateExtU32,
        gpio::{FunctionSpi, FunctionUart, Pins},
        pac,
        prelude::*,
        spi::Spi,
        uart::{DataBits, StopBits, UartConfig, UartPeripheral},
        Sio, Timer, Watchdog,
    };

    /// Second-stage bootloader, from [rp2040-boot2](https://docs.rs/rp2040-boot2)
    #[link_section = ".boot2"]
    #[used]
    pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;
    /// External high-speed crystal on the pico board is 12Mhz
    pub const XOSC_FREQ_HZ: u32 = 12_000_000;
    /// Converter bus clock
    const SPI_FREQ_HZ: u32 = 4_000_000;
    /// Host link baud rate
    const UART_BAUD: u32 = 115_200;

    /// Main operation loop
    #[entry]
    fn main() -> ! {
        info!("bpSure monitor startup");
        let mut pac = pac::Peripherals::take().unwrap();
        let mut watchdog = Watchdog::new(pac.WATCHDOG);
        let sio = Sio::new(pac.SIO);

        let clocks = init_clocks_and_plls(
            XOSC_FREQ_HZ,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        )
        .ok()
        .unwrap();
        let pins = Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );
        let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

        // Host serial link
        let mut uart = UartPeripheral::new(
            pac.UART0,
            (
                pins.gpio0.into_function::<FunctionUart>(),
                pins.gpio1.into_function::<FunctionUart>(),
            ),
            &mut pac.RESETS,
        )
        .enable(
            UartConfig::new(UART_BAUD.Hz(), DataBits::Eight, None, StopBits::One),
            clocks.peripheral_clock.freq(),
        )
        .unwrap();

        // Converters on SPI0
        let spi = Spi::<_, _, _, 8>::new(
            pac.SPI0,
            (
                pins.gpio19.into_function::<FunctionSpi>(),
                pins.gpio16.into_function::<FunctionSpi>(),
                pins.gpio18.into_function::<FunctionSpi>(),
            ),
        )
        .init(
            &mut pac.RESETS,
            clocks.peripheral_clock.freq(),
            SPI_FREQ_HZ.Hz(),
            MODE_0,
        );
        let sensors = SensorBus::new(
            spi,
            pins.gpio20.into_push_pull_output(),
            pins.gpio21.into_push_pull_output(),
            pins.gpio22.into_push_pull_output(),
            pins.gpio27.into_pull_down_input(),
            HARDWARE_WAIT,
        )
        .unwrap();

        // Status display
        let mut display = CharacterOled::new(
            pins.gpio2.into_push_pull_output(),
            pins.gpio3.into_push_pull_output(),
            pins.gpio4.into_push_pull_output(),
        )
        .unwrap();
        display.init(&mut timer).unwrap();
        render_banner(&mut display).unwrap();

        let button = pins.gpio14.into_pull_up_input();
        let led = PanelLed::init(pins.gpio25).unwrap();
        let link = singleton!(: SerialLink = SerialLink::new()).unwrap();

        // Hand the tick hardware to the interrupt and start ticking
        let mut board = Board::new(timer.alarm_0().unwrap(), button, sensors, display);
        board.start().unwrap();
        debug!("critical_section: install board");
        critical_section::with(|cs| BOARD.replace(cs, Some(board)));
        unsafe { pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0) }

        if link.puts("bpSure Monitor\r\n") == 0 {
            warn!("Startup banner not queued");
        }
        info!("System initialization complete");

        loop {
            link.service(&mut uart);
            link.echo();
            led.show(toggle_state());
        }
    }
}

/// Host builds have no firmware to run; the library is exercised by its unit tests.
#[cfg(not(target_os = "none"))]
fn main() {}
