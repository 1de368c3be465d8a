//! GF(2⁸) arithmetic over the primitive polynomial 0x11D, the field every
//! block codec in this crate multiplies and inverts matrices in.

const PRIMITIVE_POLY: u16 = 0x11D;

/// `LOG[x]` is the exponent of generator 3 such that `3^LOG[x] == x` (for
/// `x != 0`); `EXP[i]` is `3^i`. Built once at first use.
pub struct Tables {
    exp: [u8; 512],
    log: [u8; 256],
}

impl Tables {
    fn build() -> Self {
        let mut exp = [0u8; 512];
        let mut log = [0u8; 256];
        let mut x: u16 = 1;
        for i in 0..255usize {
            exp[i] = x as u8;
            log[x as usize] = i as u8;
            x <<= 1;
            if x & 0x100 != 0 {
                x ^= PRIMITIVE_POLY;
            }
        }
        for i in 255..512 {
            exp[i] = exp[i - 255];
        }
        Self { exp, log }
    }
}

fn tables() -> &'static Tables {
    use std::sync::OnceLock;
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(Tables::build)
}

pub fn mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    let sum = t.log[a as usize] as usize + t.log[b as usize] as usize;
    t.exp[sum]
}

pub fn div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by zero in GF(256)");
    if a == 0 {
        return 0;
    }
    let t = tables();
    let diff = t.log[a as usize] as i32 - t.log[b as usize] as i32 + 255;
    t.exp[diff as usize % 255]
}

pub fn pow(a: u8, e: u8) -> u8 {
    if a == 0 {
        return if e == 0 { 1 } else { 0 };
    }
    let t = tables();
    let p = (t.log[a as usize] as usize * e as usize) % 255;
    t.exp[p]
}

pub fn inv(a: u8) -> u8 {
    assert!(a != 0, "no inverse of zero in GF(256)");
    let t = tables();
    t.exp[255 - t.log[a as usize] as usize]
}

/// Multiplies every byte of `dst` by `coef` and XORs the result into `dst`
/// (i.e. `dst += coef * src`), the inner loop of matrix-vector products
/// over GF(256).
pub fn mul_add_slice(dst: &mut [u8], src: &[u8], coef: u8) {
    if coef == 0 {
        return;
    }
    let t = tables();
    if coef == 1 {
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            *d ^= *s;
        }
        return;
    }
    let log_coef = t.log[coef as usize] as usize;
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        if *s != 0 {
            *d ^= t.exp[log_coef + t.log[*s as usize] as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_and_div_are_inverse() {
        for a in 1..=255u8 {
            for b in 1..=255u8 {
                let product = mul(a, b);
                assert_eq!(div(product, b), a);
            }
        }
    }

    #[test]
    fn inv_roundtrips() {
        for a in 1..=255u8 {
            assert_eq!(mul(a, inv(a)), 1);
        }
    }

    #[test]
    fn pow_matches_repeated_mul() {
        let mut expected = 1u8;
        for e in 0..8u8 {
            assert_eq!(pow(7, e), expected);
            expected = mul(expected, 7);
        }
    }
}
