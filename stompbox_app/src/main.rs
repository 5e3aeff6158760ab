#![no_std]
#![no_main]

mod display;
mod host;
mod leds;
mod peripherals;

use panic_probe as _;

use cortex_m_rt::{exception, ExceptionFrame};

/// Terminal fault path: light the dedicated fault LED on gpio28 and park.
/// There is no recovery story on this unit, the operator power-cycles it.
#[exception]
unsafe fn HardFault(_frame: &ExceptionFrame) -> ! {
    use embedded_hal::digital::v2::OutputPin;

    let mut pac = rp_pico::hal::pac::Peripherals::steal();
    let sio = rp_pico::hal::Sio::new(pac.SIO);
    let pins = rp_pico::hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let mut fault_led = pins.gpio28.into_push_pull_output();
    let _ = fault_led.set_high();
    loop {
        cortex_m::asm::nop();
    }
}

// RTIC app module runs the firmware as a set of concurrent tasks around one
// shared Hmi state machine. This module is responsible for interfacing with
// the hardware; all UI policy lives in the stompbox_hmi crate.
#[rtic::app(
    device = rp_pico::hal::pac,
    peripherals = true,
    dispatchers = [USBCTRL_IRQ, DMA_IRQ_0, DMA_IRQ_1, PWM_IRQ_WRAP]
)]
mod app {
    use defmt::{self, error, info, trace, warn};
    use defmt_rtt as _;
    use embedded_hal::digital::v2::InputPin;
    use embedded_hal::serial::{Read, Write};
    use fugit::MicrosDurationU64;
    use heapless::{String, Vec};
    use rp_pico::hal::{
        gpio::DynPin,
        pac::I2C0,
        timer::{monotonic::Monotonic, Alarm0},
        I2C,
    };

    use crate::{
        display::{render_splash_screen, OledScreen},
        host::{ResponseSlot, UartHost},
        leds::LedDriver,
        peripherals::{
            setup, EepromPins, EncoderPinset, I2cEeprom, SystemReader, SystemWriter, WebGuiReader,
            WebGuiWriter, BUTTON_PIN_COUNT,
        },
    };
    use stompbox_hmi::{
        actuator::{ActuatorBank, ActuatorKind, EncoderPins, EventMask, InputEvent},
        event_queue::DispatchQueue,
        naveg::Hmi,
        protocol::{CommandRouter, Sender, Tokens},
        Host, OverlayTarget, ENCODERS_COUNT, FOOTSWITCH_IDS,
    };

    /// Actuator sampling period. The debounce counters in the actuator
    /// engine are tuned for a 1ms tick.
    const ACTUATOR_CLOCK_INTERVAL: MicrosDurationU64 = MicrosDurationU64::millis(1);

    /// Overlay countdown and LED blink phase update period.
    const HOUSEKEEPING_INTERVAL: MicrosDurationU64 = MicrosDurationU64::millis(10);
    const HOUSEKEEPING_INTERVAL_MS: u32 = 10;

    const BUTTON_HOLD_TICKS: u16 = 500;
    const ENCODER_HOLD_TICKS: u16 = 500;
    const DOUBLE_PRESS_TICKS: u16 = 300;

    const LINE_CAPACITY: usize = 256;

    /// The web gui link is the one we wait on for command responses.
    static WEBGUI_RESPONSES: ResponseSlot = ResponseSlot::new();

    type AppEeprom = I2cEeprom<I2C<I2C0, EepromPins>>;
    type AppHost = UartHost<WebGuiWriter>;
    type AppHmi = Hmi<OledScreen, LedDriver, AppHost, AppEeprom>;
    type AppRouter = CommandRouter<OledScreen, LedDriver, AppHost, AppEeprom>;

    /// Define RTIC monotonic timer. Also used for defmt.
    #[monotonic(binds = TIMER_IRQ_0, default = true)]
    type TimerMonotonic = Monotonic<Alarm0>;

    fn now_ms() -> u32 {
        monotonics::now().duration_since_epoch().to_millis() as u32
    }

    /// RTIC shared resources.
    #[shared]
    struct Shared {
        /// UI big-ball-of-state: screens, LEDs, controls, modes, popups.
        hmi: AppHmi,

        /// Text command dispatch for both serial links.
        router: AppRouter,

        /// Actuator events on their way from the sampling tick to the UI.
        queue: DispatchQueue,
    }

    /// RTIC local resources.
    #[local]
    struct Local {
        bank: ActuatorBank,
        buttons: [DynPin; BUTTON_PIN_COUNT],
        encoders: [EncoderPinset; ENCODERS_COUNT],
        webgui_reader: WebGuiReader,
        system_reader: SystemReader,
        system_writer: SystemWriter,
    }

    /// RTIC init method sets up the hardware and initialises shared and
    /// local resources.
    #[init]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        info!("[init] hello world!");

        // configure RTIC monotonic as source of timestamps for defmt
        defmt::timestamp!("{=u64:us}", {
            monotonics::now().duration_since_epoch().to_micros()
        });

        let (
            (webgui_reader, webgui_writer),
            (system_reader, system_writer),
            mut display,
            buttons,
            encoders,
            (led_spi, led_latch),
            eeprom,
            monotonic_timer,
        ) = setup(ctx.device);

        if render_splash_screen(&mut display).is_err() {
            error!("[init] splash screen render failed");
        }

        let mut bank = ActuatorBank::new();
        for id in 0..BUTTON_PIN_COUNT as u8 {
            bank.add_button(id);
            bank.set_button_hold_time(id as usize, BUTTON_HOLD_TICKS);
            bank.set_double_press_time(id as usize, DOUBLE_PRESS_TICKS);
            let mask = if FOOTSWITCH_IDS.contains(&id) {
                EventMask::ALL_BUTTON
            } else {
                EventMask::PRESSED.union(EventMask::RELEASED)
            };
            bank.enable_button_events(id as usize, mask);
        }
        // footswitches 0+1 double-press together to change the foot page
        bank.link_buttons(0, 1);
        for id in 0..ENCODERS_COUNT as u8 {
            bank.add_encoder(id);
            bank.set_encoder_hold_time(id as usize, ENCODER_HOLD_TICKS);
            bank.enable_encoder_events(id as usize, EventMask::ALL_ENCODER);
        }

        let hmi = Hmi::new(
            OledScreen::new(display),
            LedDriver::new(led_spi, led_latch),
            UartHost::new(webgui_writer, &WEBGUI_RESPONSES, now_ms),
            eeprom,
        );
        let router = CommandRouter::with_default_commands();

        actuator_clock::spawn().expect("actuator_clock::spawn should succeed");
        housekeeping::spawn().expect("housekeeping::spawn should succeed");

        info!("[init] complete");

        (
            Shared {
                hmi,
                router,
                queue: DispatchQueue::new(),
            },
            Local {
                bank,
                buttons,
                encoders,
                webgui_reader,
                system_reader,
                system_writer,
            },
            init::Monotonics(monotonic_timer),
        )
    }

    /// Sample every actuator once per millisecond and queue the events the
    /// debounce engine emits.
    #[task(
        priority = 4,
        shared = [queue],
        local = [bank, buttons, encoders]
    )]
    fn actuator_clock(mut ctx: actuator_clock::Context) {
        let mut levels = [false; BUTTON_PIN_COUNT];
        for (level, pin) in levels.iter_mut().zip(ctx.local.buttons.iter()) {
            *level = pin.is_low().unwrap_or(false);
        }
        let encoders = &ctx.local.encoders;
        let encoder_pins: [EncoderPins; ENCODERS_COUNT] =
            [encoders[0].read(), encoders[1].read(), encoders[2].read()];

        let events = ctx.local.bank.clock(&levels, &encoder_pins);
        if !events.is_empty() {
            ctx.shared.queue.lock(|queue| {
                for event in &events {
                    match event.kind {
                        ActuatorKind::Button => queue.push_button(*event),
                        ActuatorKind::Encoder => queue.push_encoder(*event),
                    }
                }
            });
            // AlreadySpawned just means the drain is still running
            let _ = input_dispatch::spawn();
        }

        actuator_clock::spawn_after(ACTUATOR_CLOCK_INTERVAL)
            .expect("should be able to spawn_after actuator_clock");
    }

    /// Drain the event queue into the UI state machine. Runs below the
    /// sampling tick so a burst of events never blocks debouncing.
    #[task(priority = 2, shared = [queue, hmi])]
    fn input_dispatch(mut ctx: input_dispatch::Context) {
        loop {
            let event: Option<InputEvent> = ctx.shared.queue.lock(|queue| queue.pop());
            let event = match event {
                Some(event) => event,
                None => break,
            };
            trace!("[input_dispatch] id={} status={}", event.id, event.status.0);
            ctx.shared.hmi.lock(|hmi| hmi.handle_input(event, now_ms()));
        }
    }

    /// Web gui serial link. Response lines complete the in-flight wait
    /// directly from here so the waiting task never needs a second lock.
    #[task(
        binds = UART0_IRQ,
        priority = 4,
        local = [webgui_reader, webgui_line: Vec<u8, LINE_CAPACITY> = Vec::new()]
    )]
    fn uart0_irq(ctx: uart0_irq::Context) {
        let line = ctx.local.webgui_line;
        while let Ok(byte) = ctx.local.webgui_reader.read() {
            if byte == 0 || byte == b'\n' {
                if let Ok(text) = core::str::from_utf8(line) {
                    deliver_webgui_line(text);
                }
                line.clear();
            } else if line.push(byte).is_err() {
                warn!("[uart0_irq] line overflow, dropping");
                line.clear();
            }
        }
    }

    fn deliver_webgui_line(text: &str) {
        if text.is_empty() {
            return;
        }
        let tokens = Tokens::from_line(text);
        if tokens.get(0) == Some("resp") && WEBGUI_RESPONSES.is_armed() {
            if let Ok(status) = tokens.int(1) {
                WEBGUI_RESPONSES.complete(status);
                return;
            }
        }
        let mut owned: String<LINE_CAPACITY> = String::new();
        if owned.push_str(text).is_ok() {
            if webgui_dispatch::spawn(owned).is_err() {
                error!("[uart0_irq] webgui_dispatch queue full");
            }
        }
    }

    /// System controller serial link.
    #[task(
        binds = UART1_IRQ,
        priority = 4,
        local = [system_reader, system_line: Vec<u8, LINE_CAPACITY> = Vec::new()]
    )]
    fn uart1_irq(ctx: uart1_irq::Context) {
        let line = ctx.local.system_line;
        while let Ok(byte) = ctx.local.system_reader.read() {
            if byte == 0 || byte == b'\n' {
                if let Ok(text) = core::str::from_utf8(line) {
                    if !text.is_empty() {
                        let mut owned: String<LINE_CAPACITY> = String::new();
                        if owned.push_str(text).is_ok() {
                            if system_dispatch::spawn(owned).is_err() {
                                error!("[uart1_irq] system_dispatch queue full");
                            }
                        }
                    }
                }
                line.clear();
            } else if line.push(byte).is_err() {
                warn!("[uart1_irq] line overflow, dropping");
                line.clear();
            }
        }
    }

    /// Parse one web gui command line and send the reply back on the same
    /// link.
    #[task(priority = 2, capacity = 4, shared = [hmi, router])]
    fn webgui_dispatch(ctx: webgui_dispatch::Context, line: String<LINE_CAPACITY>) {
        trace!("[webgui_dispatch] {}", line.as_str());
        (ctx.shared.hmi, ctx.shared.router).lock(|hmi, router| {
            if let Some(response) = router.parse(hmi, Sender::WebGui, line.as_str()) {
                hmi.host.send(response.as_str());
            }
        });
    }

    /// Parse one system controller command line.
    #[task(
        priority = 2,
        capacity = 4,
        shared = [hmi, router],
        local = [system_writer]
    )]
    fn system_dispatch(ctx: system_dispatch::Context, line: String<LINE_CAPACITY>) {
        trace!("[system_dispatch] {}", line.as_str());
        let response = (ctx.shared.hmi, ctx.shared.router)
            .lock(|hmi, router| router.parse(hmi, Sender::System, line.as_str()));
        if let Some(response) = response {
            for byte in response.as_bytes() {
                let _ = nb::block!(ctx.local.system_writer.write(*byte));
            }
            let _ = nb::block!(ctx.local.system_writer.write(0));
        }
    }

    /// Overlay countdown and LED blink phases, every 10ms. The redraw a
    /// finished overlay wants runs in a lower-priority task.
    #[task(priority = 3, shared = [hmi])]
    fn housekeeping(mut ctx: housekeeping::Context) {
        let expired = ctx.shared.hmi.lock(|hmi| {
            hmi.leds.refresh(now_ms());
            hmi.screen.tick(HOUSEKEEPING_INTERVAL_MS);
            hmi.screen.take_expired()
        });
        if let Some(target) = expired {
            if overlay_expired::spawn(target).is_err() {
                error!("could not spawn overlay_expired");
            }
        }

        housekeeping::spawn_after(HOUSEKEEPING_INTERVAL)
            .expect("should be able to spawn_after housekeeping");
    }

    #[task(priority = 1, shared = [hmi])]
    fn overlay_expired(mut ctx: overlay_expired::Context, target: OverlayTarget) {
        trace!("[overlay_expired]");
        ctx.shared.hmi.lock(|hmi| hmi.overlay_expired(target));
    }

    // idle task needed because default RTIC idle task calls wfi(), which breaks rtt
    #[idle]
    fn task_main(_: task_main::Context) -> ! {
        loop {
            cortex_m::asm::nop();
        }
    }
}
