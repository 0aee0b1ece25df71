mod auth;
mod server;

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

use std::net::SocketAddr;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use structopt::StructOpt;
use thermostatd_peripherals::ir::{DryRun, Lirc};
use thermostatd_peripherals::lcd::Lcd;
use thermostatd_peripherals::thermostat::{pad_line, FanSpeed, Mode, State, Thermostat};
use thermostatd_peripherals::transport::{IrSender, LineDisplay};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

fn parse_addr(src: &str) -> Result<u16, ParseIntError> {
    u16::from_str_radix(src.trim_start_matches("0x"), 16)
}

#[derive(StructOpt, Debug)]
struct IrConnection {
    /// Path of the lircd socket
    #[structopt(long, env = "THERMOSTATD_LIRCD", default_value = "/var/run/lirc/lircd")]
    lircd: PathBuf,

    /// Remote the commands are sent for
    #[structopt(long, env = "THERMOSTATD_REMOTE", default_value = "fujitsu_heat_ac")]
    remote: String,

    /// Log commands instead of sending them
    #[structopt(long)]
    dry_run: bool,
}

impl IrConnection {
    async fn connect(&self) -> eyre::Result<Box<dyn IrSender>> {
        if self.dry_run {
            return Ok(Box::new(DryRun::new(self.remote.clone())));
        }
        let lirc = Lirc::connect(&self.lircd, self.remote.clone())
            .await
            .wrap_err_with(|| format!("Could not connect to lircd at {}", self.lircd.display()))?;
        Ok(Box::new(lirc))
    }
}

#[derive(StructOpt, Debug)]
struct AcState {
    #[structopt(short, long)]
    powered: bool,
    #[structopt(short, long, default_value = "COOL")]
    mode: Mode,
    #[structopt(short, long, default_value = "AUTO")]
    fan_speed: FanSpeed,
    #[structopt(short, long, default_value = "72")]
    temperature: i32,
}

impl From<AcState> for State {
    fn from(
        AcState {
            powered,
            mode,
            fan_speed,
            temperature,
        }: AcState,
    ) -> Self {
        State {
            powered_on: powered,
            current_mode: mode,
            fan_speed,
            target_temperature: temperature,
            ..State::default()
        }
    }
}

#[derive(StructOpt, Debug)]
enum IrOpt {
    /// Send a single raw command code
    Send {
        code: String,

        #[structopt(flatten)]
        connection: IrConnection,
    },
    /// Send a full state, powering on first if needed
    State {
        #[structopt(flatten)]
        state: AcState,

        #[structopt(flatten)]
        connection: IrConnection,
    },
}

#[derive(StructOpt, Debug)]
enum Opt {
    Ir(IrOpt),
    Lcd {
        /// First line
        first: String,

        /// Second line
        #[structopt(default_value = "")]
        second: String,

        /// Duration of display in seconds
        #[structopt(short, long, default_value = "5")]
        duration: u64,

        /// I2C slave address, in hex
        #[structopt(long, default_value = "3e", parse(try_from_str = parse_addr))]
        addr: u16,

        #[structopt(long, default_value = "16")]
        columns: u8,
    },
    Server {
        /// Address for server
        #[structopt(short, long, env = "THERMOSTATD_ADDR", default_value = "0.0.0.0:8080")]
        addr: SocketAddr,

        /// Bearer token required from clients
        #[structopt(long, env = "THERMOSTATD_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[structopt(flatten)]
        connection: IrConnection,

        /// I2C slave address of the status LCD, in hex. No display when unset
        #[structopt(long, parse(try_from_str = parse_addr))]
        lcd_addr: Option<u16>,

        #[structopt(long, default_value = "16")]
        lcd_columns: u8,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;

    let opts = Opt::from_args();

    debug!("opts: {:?}", opts);

    match opts {
        Opt::Ir(ir_opts) => match ir_opts {
            IrOpt::Send { code, connection } => {
                let mut ir = connection.connect().await?;
                ir.send_command(&code)
                    .await
                    .wrap_err_with(|| format!("Could not send {}", code))?;
                println!("Finished sending {}", code);
            }
            IrOpt::State { state, connection } => {
                let mut thermostat = Thermostat::new(connection.connect().await?);
                thermostat.set_state(state.into()).await?;
                println!("Finished sending {}", thermostat.state().to_command()?);
            }
        },
        Opt::Lcd {
            first,
            second,
            duration,
            addr,
            columns,
        } => {
            let mut lcd = Lcd::new(addr, columns)?;
            let width = LineDisplay::columns(&lcd);
            println!("Displaying text: {} / {}", first, second);
            lcd.write_lines(&pad_line(&first, width), &pad_line(&second, width))?;
            lcd.wait_for_processing().await?;
            tokio::time::sleep(Duration::from_secs(duration)).await;
            println!("Clearing lcd");
            lcd.shutdown().await?;
        }
        Opt::Server {
            addr,
            token,
            connection,
            lcd_addr,
            lcd_columns,
        } => {
            let mut thermostat = Thermostat::new(connection.connect().await?);
            if let Some(lcd_addr) = lcd_addr {
                let lcd = Lcd::new(lcd_addr, lcd_columns).wrap_err("Could not start lcd")?;
                thermostat = thermostat.with_display(Box::new(lcd));
            }
            if let Err(e) = thermostat.reset().await {
                error!("could not send initial state: {}", e);
            }

            if token.is_none() {
                warn!("Running without an auth token. Anyone that is able to connect to this device will be able to change your thermostat.");
            }
            let app = server::router(Arc::new(Mutex::new(thermostat)), token);
            let listener = TcpListener::bind(addr)
                .await
                .wrap_err_with(|| format!("Could not bind {}", addr))?;

            info!("Starting server at {}", addr);

            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
