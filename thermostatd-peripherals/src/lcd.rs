use std::{sync::mpsc, thread::sleep, time::Duration};

use crate::transport::{self, LineDisplay};
use crate::I2cError;
use rppal::i2c::I2c;
use thiserror::Error;
use tokio::{
    sync::watch,
    task::{spawn_blocking, JoinHandle},
};

#[derive(Debug, Clone)]
enum LcdMessage {
    Char(u8),
    Cmd(u8, u8),
    Wait(Duration),
    Stop,
}

#[derive(Error, Clone, Debug)]
pub enum LcdError {
    #[error(transparent)]
    I2cError(#[from] I2cError),
    #[error("Could not send message to lcd thread")]
    Send,
    #[error("Could not wait for lcd thread to stop")]
    ThreadWait,
    #[error("Could not wait for processing notification")]
    ProcessingWait,
}

pub type Result<T> = std::result::Result<T, LcdError>;

/// Two line I2C character LCD. Writes are queued to a blocking thread so
/// callers never wait on the bus.
#[derive(Debug)]
pub struct Lcd {
    columns: u8,
    write_handle: JoinHandle<()>,
    write_sender: mpsc::Sender<LcdMessage>,
    processing_receiver: watch::Receiver<bool>,
}

impl Lcd {
    const INIT_SEQ: [LcdMessage; 9] = [
        LcdMessage::Cmd(0, 0x38),
        LcdMessage::Cmd(0, 0x39),
        LcdMessage::Cmd(0, 0x14),
        LcdMessage::Cmd(0, 0x70),
        LcdMessage::Cmd(0, 0x56),
        LcdMessage::Cmd(0, 0x6c),
        LcdMessage::Wait(Duration::from_millis(250)),
        LcdMessage::Cmd(0, 0x38),
        LcdMessage::Cmd(0, 0x0c),
    ];

    pub fn new(slave_addr: u16, columns: u8) -> Result<Lcd> {
        let mut i2c = I2c::new().map_err(|_| I2cError::Initialization)?;
        i2c.set_slave_address(slave_addr)
            .map_err(|_| I2cError::SlaveAddr(slave_addr))?;
        let (write_sender, write_receiver) = mpsc::channel();
        let (processing_sender, processing_receiver) = watch::channel(false);
        let write_handle = spawn_blocking(move || {
            info!("starting lcd messaging thread, slave addr {}", slave_addr);
            loop {
                let next_msg = match write_receiver.try_recv() {
                    Ok(msg) => {
                        trace!("next message was already queued");
                        msg
                    }
                    Err(e) => {
                        trace!("no message queued");
                        // notify if no message in queue
                        if let Err(e) = processing_sender.send(false) {
                            error!("error in lcd messaging thread while trying to set processing status to false: {}", e);
                            break;
                        }
                        match e {
                            mpsc::TryRecvError::Disconnected => {
                                info!("lcd messaging channel disconnected");
                                break;
                            }
                            mpsc::TryRecvError::Empty => match write_receiver.recv() {
                                Ok(msg) => msg,
                                Err(_) => {
                                    info!("lcd messaging channel had no more messages");
                                    break;
                                }
                            },
                        }
                    }
                };
                if let Err(e) = processing_sender.send(true) {
                    error!("error in lcd messaging thread while trying to set processing status to true: {}", e);
                    break;
                }
                let written = match next_msg {
                    LcdMessage::Char(c) => {
                        trace!("writing char {} to lcd", c);
                        i2c.write(&[0x40, c])
                    }
                    LcdMessage::Cmd(ctrl, data) => {
                        trace!("writing cmd {} with data {} to lcd", ctrl, data);
                        i2c.write(&[ctrl, data])
                    }
                    LcdMessage::Wait(duration) => {
                        trace!("sleeping lcd messaging thread for {:?}", duration);
                        sleep(duration);
                        Ok(0)
                    }
                    LcdMessage::Stop => {
                        trace!("stopping lcd messaging thread");
                        break;
                    }
                };
                if let Err(e) = written {
                    error!("could not write to lcd: {}", e);
                }
            }
            info!("lcd messaging thread stopping");
        });
        let mut lcd = Lcd {
            columns,
            write_handle,
            write_sender,
            processing_receiver,
        };
        lcd.init()?;
        Ok(lcd)
    }

    fn queue(&self, msg: LcdMessage) -> Result<()> {
        self.write_sender.send(msg).map_err(|_| LcdError::Send)
    }

    pub fn init(&mut self) -> Result<()> {
        trace!("initializing lcd");
        Lcd::INIT_SEQ
            .into_iter()
            .try_for_each(|msg| self.queue(msg))
    }

    pub fn clear(&mut self) -> Result<()> {
        trace!("clearing lcd");
        self.queue(LcdMessage::Cmd(0, 0x01))?;
        self.queue(LcdMessage::Wait(Duration::from_millis(2)))
    }

    pub fn first_line_head(&mut self) -> Result<()> {
        trace!("moving to head of first line of lcd");
        self.queue(LcdMessage::Cmd(0, 0x2))?;
        self.queue(LcdMessage::Wait(Duration::from_millis(2)))
    }

    pub fn second_line_head(&mut self) -> Result<()> {
        trace!("moving to head of second line of lcd");
        self.queue(LcdMessage::Cmd(0, 0xc0))?;
        self.queue(LcdMessage::Wait(Duration::from_millis(2)))
    }

    pub fn push_char(&mut self, char: u8) -> Result<()> {
        trace!("pushing char {} to lcd messaging thread", char);
        self.queue(LcdMessage::Char(char))?;
        self.queue(LcdMessage::Wait(Duration::from_micros(50)))
    }

    /// Pushes at most one line worth of `s` at the cursor.
    pub fn push_str(&mut self, s: &str) -> Result<()> {
        s.bytes()
            .take(self.columns as usize)
            .try_for_each(|c| self.push_char(c))
    }

    pub fn write_lines(&mut self, first: &str, second: &str) -> Result<()> {
        self.first_line_head()?;
        self.push_str(first)?;
        self.second_line_head()?;
        self.push_str(second)
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        trace!("shutting down lcd");
        self.clear()?;
        self.queue(LcdMessage::Stop)?;
        (&mut self.write_handle)
            .await
            .map_err(|_| LcdError::ThreadWait)?;
        Ok(())
    }

    pub fn is_write_processing(&self) -> bool {
        *self.processing_receiver.borrow()
    }

    pub async fn wait_for_processing(&mut self) -> Result<()> {
        while self.is_write_processing() {
            self.processing_receiver
                .changed()
                .await
                .map_err(|_| LcdError::ProcessingWait)?;
        }
        Ok(())
    }
}

impl LineDisplay for Lcd {
    fn columns(&self) -> usize {
        self.columns as usize
    }

    fn write_lines(&mut self, first: &str, second: &str) -> transport::Result<()> {
        Ok(Lcd::write_lines(self, first, second)?)
    }
}
