use nef_decoder_rs::nef::huffman::{HuffmanTable, HuffmanVariant};
use nef_decoder_rs::{BitDepth, NefError, NefParameters, decode_nef};
use std::time::Instant;

const HEIGHT: usize = 1024;
const RAW_WIDTH: usize = 1536;

struct BitWriter {
    bytes: Vec<u8>,
    accumulator: u32,
    bits: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            accumulator: 0,
            bits: 0,
        }
    }

    fn put(&mut self, value: u32, count: u32) {
        for i in (0..count).rev() {
            self.accumulator = (self.accumulator << 1) | ((value >> i) & 1);
            self.bits += 1;
            if self.bits == 8 {
                self.bytes.push(self.accumulator as u8);
                self.accumulator = 0;
                self.bits = 0;
            }
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.put(0, 8 - self.bits);
        }
        self.bytes
    }
}

/// Code and length of `leaf`, read back from the decoding table.
fn code_for(table: &HuffmanTable, leaf: u8) -> Option<(u32, u32)> {
    let max = table.max_code_length() as usize;
    table.slots().iter().enumerate().find_map(|(index, slot)| {
        slot.as_ref()
            .filter(|s| s.leaf.pack() == leaf)
            .map(|s| ((index >> (max - s.length as usize)) as u32, s.length as u32))
    })
}

/// Encodes a diagonal gradient as a 12-bit lossless strip behind a metadata block.
fn synthesize() -> Result<(Vec<u8>, usize), NefError> {
    let table = HuffmanTable::from_variant(HuffmanVariant::Lossless12)?;
    let mut file = vec![0x46, 0x30, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    let data_offset = file.len();

    let mut vertical = [[0i32; 2]; 2];
    let mut horizontal = [0i32; 2];
    let mut writer = BitWriter::new();
    for row in 0..HEIGHT {
        for col in 0..RAW_WIDTH {
            let target = ((row * 3 + col * 2) % 4000) as i32;
            let lane = if col < 2 {
                &mut vertical[row & 1][col]
            } else {
                &mut horizontal[col & 1]
            };
            let diff = target - *lane;
            *lane = target;
            if col < 2 {
                horizontal[col] = target;
            }

            let len = 32 - diff.unsigned_abs().leading_zeros();
            let raw = if diff < 0 { diff + (1 << len) - 1 } else { diff };
            let (code, length) = code_for(&table, len as u8).ok_or(NefError::HuffmanTableInvalid)?;
            writer.put(code, length);
            writer.put(raw as u32, len);
        }
    }
    file.extend_from_slice(&writer.finish());
    Ok((file, data_offset))
}

fn main() -> Result<(), NefError> {
    println!("Benchmarking NEF decode ({}x{}, 12-bit lossless)...", RAW_WIDTH, HEIGHT);

    let (file, data_offset) = synthesize()?;
    let parameters = NefParameters::new(BitDepth::Twelve, HEIGHT, RAW_WIDTH)?;
    println!("Compressed size: {} bytes", file.len() - data_offset);

    let iterations = 20;
    let start = Instant::now();
    let mut checksum = 0u64;
    for _ in 0..iterations {
        let image = decode_nef(&file, 0, data_offset, parameters)?;
        checksum = checksum.wrapping_add(image.data[image.data.len() - 1] as u64);
        // prevent optimization
        std::hint::black_box(&image);
    }
    let duration = start.elapsed();
    let samples = (HEIGHT * RAW_WIDTH * iterations) as f64;
    println!("Decode: {:?} for {} iterations", duration, iterations);
    println!("Throughput: {:.1} Msamples/s", samples / duration.as_secs_f64() / 1e6);

    let image = decode_nef(&file, 0, data_offset, parameters)?;
    let expected = ((HEIGHT - 1) * 3 + (RAW_WIDTH - 1) * 2) % 4000;
    if image.get(HEIGHT - 1, RAW_WIDTH - 1) as usize == expected {
        println!("Accuracy: PASSED (checksum {})", checksum);
    } else {
        println!("Accuracy: FAILED");
    }
    Ok(())
}
