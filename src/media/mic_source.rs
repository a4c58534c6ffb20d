//! Microphone capture via cpal.
//!
//! The cpal stream is not `Send`, so it lives on a dedicated worker thread
//! that owns it for the lifetime of the acquisition; the source itself only
//! holds the shared sample buffer and a stop channel.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::{WavSpec, WavWriter};
use tracing::{debug, error, info};

use super::encode;
use super::media_source::{MediaSource, SourceError};

struct StreamWorker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct MicSource {
    sample_rate: u32,
    samples: Arc<Mutex<Vec<f32>>>,
    capturing: Arc<AtomicBool>,
    worker: Option<StreamWorker>,
}

impl MicSource {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn encode_samples(&self, samples: &[f32]) -> Result<Vec<u8>, SourceError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| SourceError::CaptureFailed(e.to_string()))?;
        }

        encode::wav_to_webm(&cursor.into_inner())
            .map_err(|e| SourceError::CaptureFailed(e.to_string()))
    }
}

impl MediaSource for MicSource {
    fn open(&mut self) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let sample_rate = self.sample_rate;
        let samples = self.samples.clone();
        let capturing = self.capturing.clone();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), SourceError>>();

        let handle = std::thread::spawn(move || {
            let host = cpal::default_host();
            let device = match host.default_input_device() {
                Some(device) => device,
                None => {
                    let _ = ready_tx.send(Err(SourceError::DeviceUnavailable(
                        "no input device available".to_string(),
                    )));
                    return;
                }
            };

            info!(
                "Mic source using device: {}",
                device.name().unwrap_or_else(|_| "unknown".to_string())
            );

            let config = cpal::StreamConfig {
                channels: 1,
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| error!("Mic stream error: {}", err);
            let stream = match device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !capturing.load(Ordering::Relaxed) {
                        return;
                    }
                    if let Ok(mut samples) = samples.lock() {
                        samples.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(SourceError::DeviceUnavailable(e.to_string())));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(SourceError::DeviceUnavailable(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            // Hold the stream until release; disconnect counts as stop.
            let _ = stop_rx.recv();
            drop(stream);
            debug!("Mic stream released");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.worker = Some(StreamWorker { stop_tx, handle });
                info!("Mic stream acquired");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(SourceError::DeviceUnavailable(
                    "mic worker exited before acquiring a stream".to_string(),
                ))
            }
        }
    }

    fn start_capture(&mut self) -> Result<(), SourceError> {
        if self.worker.is_none() {
            return Err(SourceError::NotOpen);
        }

        {
            let mut samples = self.samples.lock().unwrap();
            samples.clear();
            samples.shrink_to_fit();
        }
        self.capturing.store(true, Ordering::Relaxed);

        info!("Mic capture started");
        Ok(())
    }

    fn finish_capture(&mut self) -> Result<Vec<u8>, SourceError> {
        if self.worker.is_none() {
            return Err(SourceError::NotOpen);
        }

        self.capturing.store(false, Ordering::Relaxed);

        let samples = {
            let mut guard = self.samples.lock().unwrap();
            let s = std::mem::take(&mut *guard);
            guard.shrink_to_fit();
            s
        };

        if samples.is_empty() {
            return Err(SourceError::CaptureFailed(
                "no audio samples captured".to_string(),
            ));
        }

        info!("Mic capture stopped, {} samples captured", samples.len());
        self.encode_samples(&samples)
    }

    fn snapshot(&mut self) -> Result<Vec<u8>, SourceError> {
        Err(SourceError::Unsupported)
    }

    fn close(&mut self) {
        self.capturing.store(false, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.handle.join();
            debug!("Mic source closed");
        }
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.close();
    }
}
