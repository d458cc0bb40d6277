use crate::array::Array;
use crate::error::{Error, Result};
use crate::paint::PaletteRegistry;

/// Min-max normalizes `input` and maps it through palette `name`.
///
/// The output has shape `[..input shape, 4]` (RGBA). The range is taken from
/// the input on every call; a constant input maps every value to 0.
pub(crate) fn apply(palettes: &PaletteRegistry, name: &str, input: &Array) -> Result<Array> {
    let palette = palettes
        .get(name)
        .ok_or_else(|| Error::UnknownColormap(name.to_string()))?;

    let lo = input.min().unwrap_or(0.0);
    let hi = input.max().unwrap_or(0.0);
    let span = hi - lo;

    let mut data = Vec::with_capacity(input.size() * 4);
    for &v in input.as_slice() {
        let t = if span > 0.0 { (v - lo) / span } else { 0.0 };
        data.extend_from_slice(&palette.sample(t as f32).to_array());
    }

    let mut shape = input.shape().to_vec();
    shape.push(4);
    Array::new(shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_white_ramp() {
        let registry = PaletteRegistry::with_builtins();
        let out = apply(&registry, "gray", &Array::from([0.0, 5.0, 10.0])).unwrap();
        assert_eq!(out.shape(), &[3, 4]);
        assert_eq!(
            out.as_slice(),
            &[0.0, 0.0, 0.0, 1.0, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn range_follows_input() {
        let registry = PaletteRegistry::with_builtins();
        let a = apply(&registry, "gray", &Array::from([0.0, 10.0])).unwrap();
        let b = apply(&registry, "gray", &Array::from([10.0, 20.0])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn constant_input_maps_to_low_end() {
        let registry = PaletteRegistry::with_builtins();
        let out = apply(&registry, "binary", &Array::from([3.0, 3.0])).unwrap();
        assert_eq!(out.as_slice()[..4], [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn unknown_palette() {
        let registry = PaletteRegistry::new();
        assert_eq!(
            apply(&registry, "jet", &Array::scalar(1.0)),
            Err(Error::UnknownColormap("jet".into()))
        );
    }
}
