//! `env.audio_*` imports for a wasmtime linker
//!
//! | Import | Signature | Result |
//! |---|---|---|
//! | `audio_init` | `(block_size: i32) -> i32` | 1 if an endpoint is live |
//! | `audio_current_time` | `() -> f64` | playback clock, seconds |
//! | `audio_samples` | `(ptr: i32, start_time: f64) -> f64` | block duration, seconds |
//! | `audio_sample_rate` | `() -> f64` | Hz |
//! | `audio_pause_state` | `() -> f64` | pause seconds, -1 while hidden, else 0 |
//!
//! Every import except `audio_init` traps when called before a successful
//! `audio_init`. The guest's `memory` export is looked up on every
//! `audio_samples` call: memory growth replaces the underlying buffer, so a
//! handle from an earlier call must never be reused.

use tracing::warn;
use wasmtime::{Caller, Extern, Linker};

use crate::bridge::AudioBridge;
use crate::error::Error;

/// Import module name the producer links against
pub const IMPORT_MODULE: &str = "env";

/// Export name of the producer's linear memory
pub const MEMORY_EXPORT: &str = "memory";

/// Register the audio imports on `linker`.
///
/// `get` projects the store data onto the bridge serving the imports.
pub fn add_to_linker<T: 'static>(
    linker: &mut Linker<T>,
    get: fn(&mut T) -> &mut AudioBridge,
) -> anyhow::Result<()> {
    linker.func_wrap(
        IMPORT_MODULE,
        "audio_init",
        move |mut caller: Caller<'_, T>, block_size: i32| -> i32 {
            match usize::try_from(block_size) {
                Ok(block_size) => get(caller.data_mut()).init(block_size) as i32,
                Err(_) => {
                    warn!("audio_init: {}", Error::InvalidBlockSize(block_size.into()));
                    0
                }
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "audio_current_time",
        move |mut caller: Caller<'_, T>| -> anyhow::Result<f64> {
            Ok(get(caller.data_mut()).current_time()?)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "audio_samples",
        move |mut caller: Caller<'_, T>, ptr: i32, start_time: f64| -> anyhow::Result<f64> {
            let Some(Extern::Memory(memory)) = caller.get_export(MEMORY_EXPORT) else {
                anyhow::bail!("audio_samples: failed to find guest memory");
            };
            let (data, state) = memory.data_and_store_mut(&mut caller);
            let offset = ptr as u32 as usize;
            Ok(get(state).submit_samples(data, offset, start_time)?)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "audio_sample_rate",
        move |mut caller: Caller<'_, T>| -> anyhow::Result<f64> {
            Ok(get(caller.data_mut()).sample_rate()?)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "audio_pause_state",
        move |mut caller: Caller<'_, T>| -> anyhow::Result<f64> {
            Ok(get(caller.data_mut()).pause_duration()?)
        },
    )?;

    Ok(())
}
