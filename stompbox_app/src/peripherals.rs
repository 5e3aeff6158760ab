/// Device initialisation and interfacing.
use embedded_hal::blocking::i2c::{Write as I2cWrite, WriteRead};
use embedded_hal::digital::v2::InputPin;
use fugit::RateExtU32;
use rp2040_hal::clocks::PeripheralClock;
use rp_pico::{
    hal::{
        clocks::{self, Clock},
        gpio::{
            pin::bank0::{Gpio26, Gpio27},
            DynPin, FunctionI2C, FunctionSpi, FunctionUart, Pin, Pins,
        },
        pac::{self, I2C1, RESETS, SPI0, TIMER, UART0, UART1},
        sio::Sio,
        spi::{Enabled, Spi},
        timer::{monotonic::Monotonic, Alarm0},
        uart::{DataBits, Reader, StopBits, UartConfig, UartPeripheral, Writer},
        Timer, Watchdog, I2C,
    },
    XOSC_CRYSTAL_FREQ,
};
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use stompbox_hmi::{Eeprom, ENCODERS_COUNT};

// type aliases for the two host-facing UARTs
type WebGuiUartPins = (
    Pin<rp_pico::hal::gpio::pin::bank0::Gpio0, FunctionUart>,
    Pin<rp_pico::hal::gpio::pin::bank0::Gpio1, FunctionUart>,
);
type SystemUartPins = (
    Pin<rp_pico::hal::gpio::pin::bank0::Gpio8, FunctionUart>,
    Pin<rp_pico::hal::gpio::pin::bank0::Gpio9, FunctionUart>,
);
pub type WebGuiReader = Reader<UART0, WebGuiUartPins>;
pub type WebGuiWriter = Writer<UART0, WebGuiUartPins>;
pub type SystemReader = Reader<UART1, SystemUartPins>;
pub type SystemWriter = Writer<UART1, SystemUartPins>;

// type alias for display pins
type DisplaySdaPin = Pin<Gpio26, FunctionI2C>;
type DisplaySclPin = Pin<Gpio27, FunctionI2C>;
pub type DisplayPins = (DisplaySdaPin, DisplaySclPin);

pub type Display = Ssd1306<
    I2CInterface<I2C<I2C1, DisplayPins>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SPI bus feeding the LED shift registers.
pub type LedSpi = Spi<Enabled, SPI0, 8>;

/// One quadrature encoder's raw pins: channel a, channel b, switch.
pub struct EncoderPinset {
    pub channel_a: DynPin,
    pub channel_b: DynPin,
    pub switch: DynPin,
}

impl EncoderPinset {
    /// Active-low inputs, pressed/closed reads as low.
    pub fn read(&self) -> stompbox_hmi::actuator::EncoderPins {
        stompbox_hmi::actuator::EncoderPins {
            channel_a: self.channel_a.is_low().unwrap_or(false),
            channel_b: self.channel_b.is_low().unwrap_or(false),
            switch: self.switch.is_low().unwrap_or(false),
        }
    }
}

pub const BUTTON_PIN_COUNT: usize = 7;

/// I2C EEPROM (24LC32-style), written one page at a time.
pub struct I2cEeprom<I2C> {
    i2c: I2C,
    address: u8,
}

const EEPROM_I2C_ADDRESS: u8 = 0x50;
const EEPROM_PAGE_SIZE: usize = 32;

impl<I2C, E> I2cEeprom<I2C>
where
    I2C: I2cWrite<Error = E> + WriteRead<Error = E>,
{
    pub fn new(i2c: I2C) -> I2cEeprom<I2C> {
        I2cEeprom {
            i2c,
            address: EEPROM_I2C_ADDRESS,
        }
    }
}

impl<I2C, E> Eeprom for I2cEeprom<I2C>
where
    I2C: I2cWrite<Error = E> + WriteRead<Error = E>,
{
    fn read(&mut self, address: u16, buffer: &mut [u8]) {
        let pointer = address.to_be_bytes();
        if self
            .i2c
            .write_read(self.address, &pointer, buffer)
            .is_err()
        {
            defmt::error!("eeprom read failed at {=u16}", address);
            buffer.fill(0xff);
        }
    }

    fn write(&mut self, address: u16, data: &[u8]) {
        let mut offset = 0;
        while offset < data.len() {
            let chunk = (data.len() - offset).min(EEPROM_PAGE_SIZE - 2);
            let mut frame = [0u8; EEPROM_PAGE_SIZE];
            let target = address + offset as u16;
            frame[..2].copy_from_slice(&target.to_be_bytes());
            frame[2..2 + chunk].copy_from_slice(&data[offset..offset + chunk]);
            if self.i2c.write(self.address, &frame[..2 + chunk]).is_err() {
                defmt::error!("eeprom write failed at {=u16}", target);
                return;
            }
            offset += chunk;
        }
    }
}

#[allow(clippy::type_complexity)]
pub fn setup(
    mut pac: pac::Peripherals,
) -> (
    (WebGuiReader, WebGuiWriter),
    (SystemReader, SystemWriter),
    Display,
    [DynPin; BUTTON_PIN_COUNT],
    [EncoderPinset; ENCODERS_COUNT],
    (LedSpi, DynPin),
    I2cEeprom<I2C<pac::I2C0, EepromPins>>,
    Monotonic<Alarm0>,
) {
    // setup gpio pins
    let sio = Sio::new(pac.SIO);
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // setup clocks
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let clocks = clocks::init_clocks_and_plls(
        XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .expect("init: init_clocks_and_plls(...) should succeed");

    let webgui_uart = new_host_uart_0(
        pac.UART0,
        (
            pins.gpio0.into_mode::<FunctionUart>(),
            pins.gpio1.into_mode::<FunctionUart>(),
        ),
        &mut pac.RESETS,
        &clocks.peripheral_clock,
    );
    let system_uart = new_host_uart_1(
        pac.UART1,
        (
            pins.gpio8.into_mode::<FunctionUart>(),
            pins.gpio9.into_mode::<FunctionUart>(),
        ),
        &mut pac.RESETS,
        &clocks.peripheral_clock,
    );

    let display = new_display(
        pac.I2C1,
        pins.gpio26.into_mode::<FunctionI2C>(),
        pins.gpio27.into_mode::<FunctionI2C>(),
        &mut pac.RESETS,
        &clocks.peripheral_clock,
    );

    // footswitches 0-2, encoder page buttons 3-5, shift 6
    let buttons: [DynPin; BUTTON_PIN_COUNT] = [
        pins.gpio2.into_pull_up_input().into(),
        pins.gpio3.into_pull_up_input().into(),
        pins.gpio4.into_pull_up_input().into(),
        pins.gpio5.into_pull_up_input().into(),
        pins.gpio6.into_pull_up_input().into(),
        pins.gpio7.into_pull_up_input().into(),
        pins.gpio10.into_pull_up_input().into(),
    ];

    let encoders: [EncoderPinset; ENCODERS_COUNT] = [
        EncoderPinset {
            channel_a: pins.gpio11.into_pull_up_input().into(),
            channel_b: pins.gpio12.into_pull_up_input().into(),
            switch: pins.gpio13.into_pull_up_input().into(),
        },
        EncoderPinset {
            channel_a: pins.gpio14.into_pull_up_input().into(),
            channel_b: pins.gpio15.into_pull_up_input().into(),
            switch: pins.gpio16.into_pull_up_input().into(),
        },
        EncoderPinset {
            channel_a: pins.gpio17.into_pull_up_input().into(),
            channel_b: pins.gpio20.into_pull_up_input().into(),
            switch: pins.gpio21.into_pull_up_input().into(),
        },
    ];

    // LED shift registers hang off SPI0, tx only
    let _mosi = pins.gpio19.into_mode::<FunctionSpi>();
    let _sclk = pins.gpio18.into_mode::<FunctionSpi>();
    let led_spi = Spi::<_, _, 8>::new(pac.SPI0).init(
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
        1_000_000u32.Hz(),
        &embedded_hal::spi::MODE_0,
    );
    let led_latch: DynPin = pins.gpio22.into_push_pull_output().into();

    let eeprom_i2c = I2C::i2c0(
        pac.I2C0,
        pins.gpio24.into_mode::<FunctionI2C>(),
        pins.gpio25.into_mode::<FunctionI2C>(),
        400u32.kHz(),
        &mut pac.RESETS,
        &clocks.peripheral_clock,
    );
    let eeprom = I2cEeprom::new(eeprom_i2c);

    (
        webgui_uart,
        system_uart,
        display,
        buttons,
        encoders,
        (led_spi, led_latch),
        eeprom,
        new_monotonic_timer(pac.TIMER, &mut pac.RESETS),
    )
}

pub type EepromPins = (
    Pin<rp_pico::hal::gpio::pin::bank0::Gpio24, FunctionI2C>,
    Pin<rp_pico::hal::gpio::pin::bank0::Gpio25, FunctionI2C>,
);

fn new_monotonic_timer(timer: TIMER, resets: &mut RESETS) -> Monotonic<Alarm0> {
    let mut timer = Timer::new(timer, resets);
    let monotonic_alarm = timer
        .alarm_0()
        .expect("init: alarm_0 should be available at boot");
    Monotonic::new(timer, monotonic_alarm)
}

fn new_host_uart_0(
    uart: UART0,
    uart_pins: WebGuiUartPins,
    resets: &mut RESETS,
    peripheral_clock: &PeripheralClock,
) -> (WebGuiReader, WebGuiWriter) {
    let config = UartConfig::new(500_000u32.Hz(), DataBits::Eight, None, StopBits::One);
    let mut uart = UartPeripheral::new(uart, uart_pins, resets)
        .enable(config, peripheral_clock.freq())
        .expect("enabling web gui uart should succeed");
    uart.enable_rx_interrupt();
    uart.split()
}

fn new_host_uart_1(
    uart: UART1,
    uart_pins: SystemUartPins,
    resets: &mut RESETS,
    peripheral_clock: &PeripheralClock,
) -> (SystemReader, SystemWriter) {
    let config = UartConfig::new(115_200u32.Hz(), DataBits::Eight, None, StopBits::One);
    let mut uart = UartPeripheral::new(uart, uart_pins, resets)
        .enable(config, peripheral_clock.freq())
        .expect("enabling system uart should succeed");
    uart.enable_rx_interrupt();
    uart.split()
}

fn new_display(
    i2c: I2C1,
    sda_pin: DisplaySdaPin,
    scl_pin: DisplaySclPin,
    resets: &mut RESETS,
    peripheral_clock: &PeripheralClock,
) -> Display {
    let i2c_bus = I2C::i2c1(i2c, sda_pin, scl_pin, 1u32.MHz(), resets, peripheral_clock);

    let mut display = Ssd1306::new(
        I2CDisplayInterface::new_alternate_address(i2c_bus),
        DisplaySize128x64,
        DisplayRotation::Rotate0,
    )
    .into_buffered_graphics_mode();

    display.init().expect("init: display initialisation failed");
    display
}
