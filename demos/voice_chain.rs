//! Offline render of a full voice chain:
//! metallic noise → filter bank → resonant VCF → wavefolder.
//!
//! Prints per-stage RMS levels for one second of audio.

use voicecore::prelude::*;

fn main() {
    let sample_rate = 44100.0;
    let frames = sample_rate as usize;

    let mut noise = NoiseBank::new(sample_rate);
    let mut bank = PolyFilterBank::new(sample_rate);
    let mut vcf = PolyVcf::new(sample_rate);
    let mut folder = PolyFolder::new(sample_rate);

    vcf.params.frequency.base = 0.7;
    vcf.params.resonance = 1.4;
    folder.params.fold.base = 5.0;

    let mut noise_out = [PolySignal::new(); NoiseBank::OUTPUT_COUNT];
    let mut bank_out = [PolySignal::new(); PolyFilterBank::OUTPUT_COUNT];
    let mut vcf_out = [PolySignal::new()];
    let mut folder_out = [PolySignal::new()];

    let mut rms = [0.0f64; 4];
    for _ in 0..frames {
        noise.process(&[], &mut noise_out);

        bank.process(&noise_out[..1], &mut bank_out);

        // Feed the VCF from the brightest bank tap
        vcf.process(&[bank_out[5], PolySignal::new()], &mut vcf_out);

        folder.process(
            &[vcf_out[0], PolySignal::new(), PolySignal::new()],
            &mut folder_out,
        );

        rms[0] += noise_out[0].voltage(0).powi(2);
        rms[1] += bank_out[5].voltage(0).powi(2);
        rms[2] += vcf_out[0].voltage(0).powi(2);
        rms[3] += folder_out[0].voltage(0).powi(2);
    }

    let labels = ["noise (808)", "bank lp3000", "vcf", "folder"];
    for (label, sum) in labels.iter().zip(rms.iter()) {
        println!("{:<12} rms = {:.3} V", label, (sum / frames as f64).sqrt());
    }
}
