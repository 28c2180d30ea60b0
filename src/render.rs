//! Text-art rendering of MNIST digits.
//!
//! Each character covers a vertical pair of pixels. The printable ASCII
//! character whose measured ink in its upper and lower halves is closest to
//! the pair's intensities is chosen, so a 28x28 image becomes 28 columns by
//! 14 rows inside a `+---+` border.

use crate::mnist::{Image, IMAGE_SIDE_LENGTH};

const FIRST_PRINTABLE: u8 = b' ';

/// Upper/lower half intensities of `' '..='~'`, on the 0..=255 scale.
const LETTER_INTENSITIES: [(f64, f64); 95] = [
    (0.000000, 0.000000),
    (72.857143, 57.954545),
    (72.857143, 0.000000),
    (191.250000, 208.636364),
    (200.357143, 197.045455),
    (182.142857, 208.636364),
    (136.607143, 197.045455),
    (54.642857, 0.000000),
    (81.964286, 92.727273),
    (81.964286, 92.727273),
    (100.178571, 115.909091),
    (100.178571, 46.363636),
    (0.000000, 69.545455),
    (63.750000, 0.000000),
    (0.000000, 46.363636),
    (81.964286, 81.136364),
    (154.821429, 150.681818),
    (91.071429, 69.545455),
    (118.392857, 139.090909),
    (136.607143, 127.500000),
    (127.500000, 162.272727),
    (173.035714, 127.500000),
    (173.035714, 150.681818),
    (127.500000, 69.545455),
    (163.928571, 150.681818),
    (163.928571, 162.272727),
    (36.428571, 46.363636),
    (36.428571, 69.545455),
    (63.750000, 69.545455),
    (63.750000, 81.136364),
    (63.750000, 69.545455),
    (127.500000, 69.545455),
    (227.678571, 243.409091),
    (118.392857, 173.863636),
    (200.357143, 173.863636),
    (118.392857, 127.500000),
    (173.035714, 173.863636),
    (173.035714, 139.090909),
    (173.035714, 69.545455),
    (118.392857, 197.045455),
    (191.250000, 139.090909),
    (91.071429, 92.727273),
    (72.857143, 127.500000),
    (154.821429, 139.090909),
    (72.857143, 139.090909),
    (236.785714, 231.818182),
    (200.357143, 185.454545),
    (163.928571, 162.272727),
    (200.357143, 69.545455),
    (163.928571, 197.045455),
    (200.357143, 139.090909),
    (127.500000, 127.500000),
    (127.500000, 69.545455),
    (145.714286, 150.681818),
    (145.714286, 104.318182),
    (255.000000, 162.272727),
    (127.500000, 139.090909),
    (136.607143, 69.545455),
    (127.500000, 139.090909),
    (118.392857, 139.090909),
    (163.928571, 115.909091),
    (118.392857, 139.090909),
    (45.535714, 0.000000),
    (0.000000, 104.318182),
    (27.321429, 0.000000),
    (63.750000, 208.636364),
    (127.500000, 173.863636),
    (63.750000, 115.909091),
    (127.500000, 173.863636),
    (63.750000, 197.045455),
    (136.607143, 69.545455),
    (81.964286, 255.000000),
    (127.500000, 139.090909),
    (45.535714, 69.545455),
    (45.535714, 115.909091),
    (100.178571, 150.681818),
    (72.857143, 69.545455),
    (118.392857, 208.636364),
    (81.964286, 139.090909),
    (63.750000, 150.681818),
    (81.964286, 185.454545),
    (81.964286, 185.454545),
    (63.750000, 69.545455),
    (72.857143, 150.681818),
    (109.285714, 92.727273),
    (54.642857, 173.863636),
    (54.642857, 115.909091),
    (81.964286, 208.636364),
    (54.642857, 127.500000),
    (54.642857, 139.090909),
    (81.964286, 139.090909),
    (100.178571, 115.909091),
    (81.964286, 104.318182),
    (100.178571, 115.909091),
    (72.857143, 0.000000),
];

/// Character that best matches an upper/lower pixel pair. Never a backslash.
pub fn letter_for(upper: u8, lower: u8) -> char {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, &(u, l)) in LETTER_INTENSITIES.iter().enumerate() {
        if FIRST_PRINTABLE + i as u8 == b'\\' {
            continue;
        }
        let diff = (f64::from(upper) - u).abs() + (f64::from(lower) - l).abs();
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    char::from(FIRST_PRINTABLE + best as u8)
}

/// Render `image` as bordered text art, one `\n`-terminated line per row.
pub fn text_art(image: &Image) -> String {
    let border = format!("+{}+\n", "-".repeat(IMAGE_SIDE_LENGTH));
    let mut out = String::with_capacity((IMAGE_SIDE_LENGTH + 3) * (IMAGE_SIDE_LENGTH / 2 + 2));
    out.push_str(&border);
    for y in (0..IMAGE_SIDE_LENGTH).step_by(2) {
        out.push('|');
        for x in 0..IMAGE_SIDE_LENGTH {
            out.push(letter_for(image.intensity(x, y), image.intensity(x, y + 1)));
        }
        out.push_str("|\n");
    }
    out.push_str(&border);
    out
}

/// Text art followed by the caption the viewer prints under each image.
pub fn captioned(image: &Image, infer_index: usize, label: usize, answer: usize) -> String {
    let mut out = text_art(image);
    out.push_str(&format!(
        "infer={} image={} label={} answer={}\n",
        infer_index,
        image.index(),
        label,
        answer
    ));
    out
}
