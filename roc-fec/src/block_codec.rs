//! Systematic MDS block erasure codec: encodes `k` source shards into `m`
//! repair shards, and reconstructs any missing source shards from any `k`
//! of the `k + m` total shards (spec §8 "FEC round-trip").

use crate::galois::mul_add_slice;
use crate::matrix::Matrix;
use roc_packet::FecScheme;
use roc_shared::error::{Error, Result};

fn systematic_matrix(scheme: FecScheme, k: usize, m: usize) -> Matrix {
    match scheme {
        FecScheme::ReedSolomon8m => Matrix::vandermonde_systematic(k, m),
        FecScheme::LdpcStaircase => Matrix::cauchy_systematic(k, m),
    }
}

/// Produces `m` repair shards from `source` (all shards must be the same
/// length; that length is the payload size for this block).
pub fn encode(scheme: FecScheme, source: &[Vec<u8>], m: usize) -> Result<Vec<Vec<u8>>> {
    let k = source.len();
    if k == 0 || m == 0 {
        return Err(Error::BadConfig("fec encode requires k > 0 and m > 0".into()));
    }
    let shard_len = source[0].len();
    if source.iter().any(|s| s.len() != shard_len) {
        return Err(Error::BadConfig("fec encode: mismatched shard lengths".into()));
    }
    let full = systematic_matrix(scheme, k, m);
    let mut repair = vec![vec![0u8; shard_len]; m];
    for (r, out_shard) in repair.iter_mut().enumerate() {
        let row = full.row(k + r);
        for (c, coef) in row.iter().enumerate() {
            mul_add_slice(out_shard, &source[c], *coef);
        }
    }
    Ok(repair)
}

/// Reconstructs all `k` source shards given any `k` of the `k + m` total
/// shards, each tagged with its encoding symbol id (`0..k` for source,
/// `k..k+m` for repair, matching [`roc_packet::views::FecView`]'s
/// `encoding_symbol_id` within its symbol-kind range plus this function's
/// own `k`-offset for repair rows). Fails with [`Error::BadBuffer`] if
/// fewer than `k` shards are supplied.
pub fn decode(
    scheme: FecScheme,
    available: &[(usize, Vec<u8>)],
    k: usize,
    m: usize,
) -> Result<Vec<Vec<u8>>> {
    if available.len() < k {
        return Err(Error::BadBuffer);
    }
    let shard_len = available[0].1.len();
    let full = systematic_matrix(scheme, k, m);

    let chosen = &available[..k];
    let row_indices: Vec<usize> = chosen.iter().map(|(idx, _)| *idx).collect();
    let submatrix = full.select_rows(&row_indices);
    let inverse = submatrix.invert()?;

    let mut recovered = vec![vec![0u8; shard_len]; k];
    for (out_c, out_shard) in recovered.iter_mut().enumerate() {
        for (row, (_, shard)) in chosen.iter().enumerate() {
            let coef = inverse.get(out_c, row);
            mul_add_slice(out_shard, shard, coef);
        }
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source(k: usize, len: usize) -> Vec<Vec<u8>> {
        (0..k)
            .map(|i| (0..len).map(|b| (i * 7 + b) as u8).collect())
            .collect()
    }

    #[test]
    fn rs8m_reconstructs_with_exactly_m_losses() {
        let k = 10;
        let m = 5;
        let source = sample_source(k, 64);
        let repair = encode(FecScheme::ReedSolomon8m, &source, m).unwrap();

        // Drop the first `m` source shards (simulate worst-case loss).
        let mut available: Vec<(usize, Vec<u8>)> = Vec::new();
        for i in m..k {
            available.push((i, source[i].clone()));
        }
        for j in 0..m {
            available.push((k + j, repair[j].clone()));
        }
        let recovered = decode(FecScheme::ReedSolomon8m, &available, k, m).unwrap();
        assert_eq!(recovered, source);
    }

    #[test]
    fn ldpc_staircase_reconstructs_scattered_losses() {
        let k = 8;
        let m = 3;
        let source = sample_source(k, 32);
        let repair = encode(FecScheme::LdpcStaircase, &source, m).unwrap();

        let lost = [1, 4, 6];
        let mut available: Vec<(usize, Vec<u8>)> = Vec::new();
        for (i, shard) in source.iter().enumerate() {
            if !lost.contains(&i) {
                available.push((i, shard.clone()));
            }
        }
        for j in 0..m {
            available.push((k + j, repair[j].clone()));
        }
        let recovered = decode(FecScheme::LdpcStaircase, &available, k, m).unwrap();
        assert_eq!(recovered, source);
    }

    #[test]
    fn too_few_shards_fails_cleanly() {
        let k = 4;
        let m = 2;
        let source = sample_source(k, 16);
        let repair = encode(FecScheme::ReedSolomon8m, &source, m).unwrap();
        let available = vec![(0, source[0].clone()), (k, repair[0].clone())];
        assert!(decode(FecScheme::ReedSolomon8m, &available, k, m).is_err());
    }
}
