use crate::error::{Error, Result};
use crate::pcm::PcmBuffer;

/// Additively mix tone buffers into a host buffer.
///
/// The output has the host's length and format. A tone shorter than the host
/// contributes nothing past its end; it is never looped. Each output sample
/// is hard-clamped to [-1, 1]. The host is left untouched.
pub fn mix(host: &PcmBuffer, tones: &[PcmBuffer]) -> Result<PcmBuffer> {
    for (index, tone) in tones.iter().enumerate() {
        if tone.sample_rate() != host.sample_rate() || tone.num_channels() != host.num_channels() {
            return Err(Error::FormatMismatch {
                index,
                expected_rate: host.sample_rate(),
                expected_channels: host.num_channels(),
                got_rate: tone.sample_rate(),
                got_channels: tone.num_channels(),
            });
        }
    }

    let channels = host
        .channels()
        .iter()
        .enumerate()
        .map(|(c, host_ch)| {
            let mut out = host_ch.clone();
            for tone in tones {
                let tone_ch = &tone.channels()[c];
                for (o, &t) in out.iter_mut().zip(tone_ch.iter()) {
                    *o += t;
                }
            }
            for o in out.iter_mut() {
                *o = o.clamp(-1.0, 1.0);
            }
            out
        })
        .collect();

    PcmBuffer::new(host.sample_rate(), channels)
}
