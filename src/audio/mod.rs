pub mod ambient;
pub mod chime;

use ambient::{AmbientSound, OceanSwell, SoftRain, WarmNoise};
use chime::ChimeTone;

use log::warn;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use serde::{Deserialize, Serialize};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChimeKind {
    SessionStart,
    SessionEnd,
}

/// Audio side of the sequencer, injected so tests can substitute a
/// recording fake. Every call is fire-and-forget: playback failure never
/// affects session-state correctness.
pub trait AudioCues: Send + Sync {
    fn play_chime(&self, kind: ChimeKind);
    fn start_ambient(&self, sound: AmbientSound, volume: f32);
    fn pause_all(&self);
    fn resume_all(&self);
    fn stop_all(&self);
    fn fade_out_all(&self, fade: Duration);
    fn set_volume(&self, volume: f32);
}

enum AudioCommand {
    Chime(ChimeKind),
    StartAmbient { sound: AmbientSound, volume: f32 },
    Pause,
    Resume,
    Stop,
    FadeOut { fade: Duration },
    SetVolume(f32),
}

const FADE_STEPS: u32 = 20;

/// Rodio-backed implementation. The non-`Send` output stream and sinks live
/// on a dedicated audio thread fed through a command channel; the handle
/// itself is cheap to clone and share.
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
}

impl AudioEngineHandle {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("stillpoint-audio".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
                let mut ambient: Option<Sink> = None;

                fn new_sink(
                    output: &mut Option<(OutputStream, OutputStreamHandle)>,
                ) -> Result<Sink, String> {
                    if output.is_none() {
                        let (stream, handle) = OutputStream::try_default()
                            .map_err(|e| format!("failed to open audio output: {e}"))?;
                        *output = Some((stream, handle));
                    }
                    match output.as_ref() {
                        Some((_, handle)) => Sink::try_new(handle)
                            .map_err(|e| format!("failed to create sink: {e}")),
                        None => Err("audio output unavailable".to_string()),
                    }
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Chime(kind) => match new_sink(&mut output) {
                            Ok(sink) => {
                                sink.append(ChimeTone::new(kind));
                                // Short cue; let it play out on its own.
                                sink.detach();
                            }
                            Err(err) => warn!("chime dropped: {err}"),
                        },
                        AudioCommand::StartAmbient { sound, volume } => {
                            if let Some(old) = ambient.take() {
                                old.stop();
                            }
                            match new_sink(&mut output) {
                                Ok(sink) => {
                                    sink.set_volume(volume.clamp(0.0, 1.0));
                                    match sound {
                                        AmbientSound::OceanSwell => sink.append(OceanSwell::new()),
                                        AmbientSound::SoftRain => sink.append(SoftRain::new()),
                                        AmbientSound::WarmNoise => sink.append(WarmNoise::new()),
                                    }
                                    ambient = Some(sink);
                                }
                                Err(err) => warn!("ambient audio unavailable: {err}"),
                            }
                        }
                        AudioCommand::Pause => {
                            if let Some(ref sink) = ambient {
                                sink.pause();
                            }
                        }
                        AudioCommand::Resume => {
                            if let Some(ref sink) = ambient {
                                sink.play();
                            }
                        }
                        AudioCommand::Stop => {
                            if let Some(sink) = ambient.take() {
                                sink.stop();
                            }
                            output = None;
                        }
                        AudioCommand::FadeOut { fade } => {
                            if let Some(sink) = ambient.take() {
                                let start = sink.volume();
                                let step = fade / FADE_STEPS;
                                for remaining in (0..FADE_STEPS).rev() {
                                    sink.set_volume(start * remaining as f32 / FADE_STEPS as f32);
                                    thread::sleep(step);
                                }
                                sink.stop();
                            }
                        }
                        AudioCommand::SetVolume(volume) => {
                            if let Some(ref sink) = ambient {
                                sink.set_volume(volume.clamp(0.0, 1.0));
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }

    fn send(&self, cmd: AudioCommand) {
        match self.ensure_thread() {
            Ok(tx) => {
                if let Err(err) = tx.send(cmd) {
                    warn!("audio command dropped: {err}");
                }
            }
            Err(err) => warn!("audio engine unavailable: {err}"),
        }
    }
}

impl Default for AudioEngineHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCues for AudioEngineHandle {
    fn play_chime(&self, kind: ChimeKind) {
        self.send(AudioCommand::Chime(kind));
    }

    fn start_ambient(&self, sound: AmbientSound, volume: f32) {
        self.send(AudioCommand::StartAmbient { sound, volume });
    }

    fn pause_all(&self) {
        self.send(AudioCommand::Pause);
    }

    fn resume_all(&self) {
        self.send(AudioCommand::Resume);
    }

    fn stop_all(&self) {
        self.send(AudioCommand::Stop);
    }

    fn fade_out_all(&self, fade: Duration) {
        self.send(AudioCommand::FadeOut { fade });
    }

    fn set_volume(&self, volume: f32) {
        self.send(AudioCommand::SetVolume(volume));
    }
}
