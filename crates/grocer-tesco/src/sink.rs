use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use serde::Serialize;

use crate::record::ProductRecord;

/// Writes items as one JSON array, an item per line.
pub struct JsonArrayWriter<W: Write> {
    wtr: W,
    empty: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn open(mut wtr: W) -> io::Result<Self> {
        wtr.write_all(b"[")?;
        Ok(Self { wtr, empty: true })
    }

    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.empty {
            self.wtr.write_all(b"\n")?;
            self.empty = false;
        } else {
            self.wtr.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut self.wtr, item)?;
        Ok(())
    }

    pub fn close(mut self) -> io::Result<W> {
        self.wtr.write_all(b"\n]")?;
        self.wtr.flush()?;
        Ok(self.wtr)
    }
}

/// Handle to a thread writing records to a JSON array file, in the order they're sent.
///
/// The array is closed by [`RecordSink::close`] or, at the latest, when the last clone
/// is dropped.
#[derive(Debug, Clone)]
pub struct RecordSink {
    channels: Arc<Channels>,
}

#[derive(Debug)]
struct Channels {
    tx_record: Sender<ProductRecord>,
    tx_stop: Sender<()>,
    rx_done: Receiver<()>,
}

impl Channels {
    fn close(&self) {
        if self.tx_stop.try_send(()).is_ok() {
            self.rx_done.recv().ok();
        }
    }
}

impl Drop for Channels {
    fn drop(&mut self) {
        self.close();
    }
}

impl RecordSink {
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file = fs_err::File::create(path.as_ref())?;
        Self::spawn(BufWriter::new(file))
    }

    pub fn spawn<W: Write + Send + 'static>(wtr: W) -> anyhow::Result<Self> {
        let (tx_record, rx_record) = unbounded::<ProductRecord>();
        let (tx_stop, rx_stop) = bounded::<()>(1);
        let (tx_done, rx_done) = bounded::<()>(1);

        let mut wtr = JsonArrayWriter::open(wtr)?;

        thread::Builder::new()
            .name("record-sink".into())
            .spawn(move || {
                let write = |wtr: &mut JsonArrayWriter<W>, record: ProductRecord| {
                    if let Err(e) = wtr.write(&record) {
                        log::error!("Couldn't write record {}: {e}", record.product_url);
                    }
                };
                loop {
                    select! {
                        recv(rx_stop) -> _ => {
                            // Records sent before the stop are still written
                            for record in rx_record.try_iter() {
                                write(&mut wtr, record);
                            }
                            break;
                        },
                        recv(rx_record) -> msg => match msg {
                            Ok(record) => write(&mut wtr, record),
                            Err(_) => break,
                        }
                    }
                }
                if let Err(e) = wtr.close() {
                    log::error!("Couldn't close output: {e}");
                }
                tx_done.send(()).ok();
            })?;

        Ok(Self {
            channels: Arc::new(Channels {
                tx_record,
                tx_stop,
                rx_done,
            }),
        })
    }

    pub fn send(&self, record: ProductRecord) {
        log::debug!("Emitting product {}", record.product_id);
        if let Err(e) = self.channels.tx_record.send(record) {
            log::error!("Couldn't send record {}: writer is closed", e.0.product_url);
        }
    }

    /// Closes the array and waits until the output is flushed. Later calls do nothing.
    pub fn close(&self) {
        self.channels.close();
    }
}
