//! Plays a bandlimited sawtooth arpeggio through a feedback delay on the
//! default output device. The audio callback pulls the graph through
//! `fill_buffer_of_floats`; the main thread changes pitch through the
//! lock-free command queue.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::info;

use blocksynth::graph::{BandlimitedSaw, BasicDelay, Control, Signal};
use blocksynth::synth::Synth;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("no audio output device")?;
    let config = device.default_output_config()?;
    if config.sample_format() != cpal::SampleFormat::F32 {
        return Err("demo expects an f32 output stream".into());
    }
    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    info!("audio out: {} at {} Hz, {} channels", device.name()?, sample_rate, channels);

    let synth = Synth::new(sample_rate);
    let freq = synth.add_parameter("freq", 110.0, 27.5, 1_760.0);

    // Saw -> echo. The smoother turns parameter steps into short glides.
    let voice: Signal = BandlimitedSaw::new(Control::from(freq).smoothed(0.04)).into();
    let echo = BasicDelay::new(voice * 0.4, 0.375, 1.0, sample_rate)
        .feedback(0.35)
        .mix(0.4);
    synth.set_output(echo);

    let callback_synth = synth.clone();
    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            callback_synth.fill_buffer_of_floats(data, channels);
        },
        |err| tracing::error!("audio stream error: {err}"),
        None,
    )?;
    stream.play()?;

    let scale = [0, 3, 5, 7, 10, 12, 10, 7, 5, 3];
    #[cfg(feature = "rtrb")]
    {
        use blocksynth::synth::SynthCommand;
        let mut commands = synth.command_channel(64);
        let index = synth.parameter_index("freq").expect("registered above");
        for semitones in scale.iter().cycle().take(40) {
            let value = 110.0 * 2.0_f32.powf(*semitones as f32 / 12.0);
            commands.send(SynthCommand::SetParameter { index, value });
            std::thread::sleep(std::time::Duration::from_millis(250));
        }
    }
    #[cfg(not(feature = "rtrb"))]
    for semitones in scale.iter().cycle().take(40) {
        let value = 110.0 * 2.0_f32.powf(*semitones as f32 / 12.0);
        synth.set_parameter("freq", value);
        std::thread::sleep(std::time::Duration::from_millis(250));
    }

    Ok(())
}
