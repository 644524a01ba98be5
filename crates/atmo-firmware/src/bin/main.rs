#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_sync::channel::Channel;
use embassy_time::Timer;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use log::info;
use rtt_target::rprintln;
use static_cell::StaticCell;

// Display-LCD panel specific imports
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::options::{Orientation, Rotation};
use mipidsi::{Builder as MipidsiBuilder, models::ST7789};

use atmo_core::chart::ParticleTrend;
use atmo_core::config::NodeConfig;
use atmo_core::sensors::{Max44009, Mhz19, Pms5003, PmsMode};
use atmo_firmware::app_state::{NodeState, SharedNodeState};
use atmo_firmware::net::{self, TELEMETRY_QUEUE_DEPTH};
use atmo_firmware::tasks::sample::{SAMPLE_PERIOD, sample_task};
use atmo_firmware::{buttons, wifi_secrets};

// TTGO T-Display panel: 135x240 ST7789, used in landscape.
const DISPLAY_WIDTH: u16 = 135;
const DISPLAY_HEIGHT: u16 = 240;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static STATE: StaticCell<SharedNodeState> = StaticCell::new();
static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();
static TELEMETRY: Channel<
    embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
    atmo_core::station::AtmoReading,
    TELEMETRY_QUEUE_DEPTH,
> = Channel::new();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_print!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    rprintln!("Embassy initialized!");

    // Bring up the radio and hand the station interface to embassy-net.
    let radio_init = esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller");
    let radio_init: &'static _ = alloc::boxed::Box::leak(alloc::boxed::Box::new(radio_init));
    let (wifi_controller, interfaces) = esp_radio::wifi::new(
        radio_init,
        peripherals.WIFI,
        esp_radio::wifi::Config::default(),
    )
    .expect("Failed to initialize Wi-Fi controller");

    let mut rng = esp_hal::rng::Rng::new(peripherals.RNG);
    let net_seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(embassy_net::StackResources::new()),
        net_seed,
    );

    // Configure and initialize the display

    // 1. Configure SPI bus
    let spi_bus = Spi::new(peripherals.SPI2, SpiConfig::default())
        .unwrap()
        .with_sck(peripherals.GPIO18)
        .with_mosi(peripherals.GPIO19);

    // 2. Panel chip-select, data/command and reset lines
    let cs = Output::new(peripherals.GPIO5, Level::High, OutputConfig::default());
    let dc = Output::new(peripherals.GPIO16, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO23, Level::High, OutputConfig::default());

    // 3. Backlight on
    let _backlight = Output::new(peripherals.GPIO4, Level::High, OutputConfig::default());

    // 4. Wrap the SPI bus as a SPI device (required by embedded-hal traits)
    let spi_device = ExclusiveDevice::new_no_delay(spi_bus, cs).unwrap();

    // 5. Create a buffer for SPI batching (larger = faster, uses more RAM)
    static SPI_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();
    let di = SpiInterface::new(spi_device, dc, SPI_BUFFER.init([0u8; 512]));

    // 6. Build and initialize the display driver. The T-Display panel
    // sits offset inside the controller's RAM and runs landscape here.
    let mut display = MipidsiBuilder::new(ST7789, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .display_offset(52, 40)
        .orientation(Orientation::new().rotate(Rotation::Deg90))
        .reset_pin(rst)
        .init(&mut embassy_time::Delay)
        .expect("Failed to initialize display");

    rprintln!("Display initialized!");

    // Sensor transports: two UARTs for the serial sensors, I2C for the
    // light sensor, same pins the board has always used.
    let pms_uart = esp_hal::uart::Uart::new(
        peripherals.UART1,
        esp_hal::uart::Config::default().with_baudrate(9600),
    )
    .unwrap()
    .with_rx(peripherals.GPIO15)
    .with_tx(peripherals.GPIO17)
    .into_async();

    let co2_uart = esp_hal::uart::Uart::new(
        peripherals.UART2,
        esp_hal::uart::Config::default().with_baudrate(9600),
    )
    .unwrap()
    .with_rx(peripherals.GPIO13)
    .with_tx(peripherals.GPIO12)
    .into_async();

    let i2c = esp_hal::i2c::master::I2c::new(
        peripherals.I2C0,
        esp_hal::i2c::master::Config::default(),
    )
    .unwrap()
    .with_sda(peripherals.GPIO21)
    .with_scl(peripherals.GPIO22)
    .into_async();

    let mut particulate = Pms5003::new(pms_uart);
    let mut co2 = Mhz19::new(co2_uart);
    let mut brightness = Max44009::new(i2c);

    // The particulate sensor only answers when asked; the CO2 sensor
    // must not self-calibrate in rooms that never see outdoor air.
    particulate
        .set_mode(PmsMode::Passive)
        .await
        .expect("PMS5003 not responding");
    co2.set_auto_calibration(false)
        .await
        .expect("MH-Z19 not responding");
    match co2.auto_calibration().await {
        Ok(enabled) => info!("MH-Z19 ABC status: {}", if enabled { "ON" } else { "OFF" }),
        Err(e) => info!("MH-Z19 ABC status unknown: {e}"),
    }
    brightness.start().await.expect("MAX44009 not responding");

    // Buttons: GPIO0 restarts, GPIO35 resets the provisioning.
    let restart_button = Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    );
    let portal_button = Input::new(
        peripherals.GPIO35,
        InputConfig::default().with_pull(Pull::None),
    );

    let state: &'static SharedNodeState = STATE.init(SharedNodeState::new(NodeState::new()));

    // Provisioned at build time; the portal flow would hand over the
    // same two values.
    let node_config = NodeConfig {
        mqtt_server: wifi_secrets::MQTT_SERVER,
        room: wifi_secrets::ROOM,
    };

    spawner.must_spawn(net::connection_task(wifi_controller));
    spawner.must_spawn(net::net_task(runner));
    spawner.must_spawn(net::telemetry_task(stack, TELEMETRY.receiver(), node_config));
    spawner.must_spawn(buttons::button_task(restart_button, portal_button));
    spawner.must_spawn(sample_task(
        state,
        particulate,
        co2,
        brightness,
        TELEMETRY.sender(),
    ));

    info!("AtmoNode up, sampling for room '{}'", wifi_secrets::ROOM);

    // Render loop: redraw the trend chart once per sampling period,
    // reading the histories through the shared state only.
    let chart_bounds = Rectangle::new(
        Point::zero(),
        Size::new(u32::from(DISPLAY_HEIGHT), u32::from(DISPLAY_WIDTH)),
    );
    loop {
        {
            let node = state.lock().await;
            ParticleTrend::new(&node.histories, chart_bounds)
                .draw(&mut display)
                .expect("display write failed");
        }
        Timer::after(SAMPLE_PERIOD).await;
    }
}
