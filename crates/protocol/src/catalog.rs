//! Built-in operations offered by the host

use crate::operation::{Operation, OperationSet, Parameter};

/// Operation names, in dropdown order
pub const BUILTIN_NAMES: &[&str] = &[
    "grayscale",
    "blur",
    "canny",
    "threshold",
    "equalize_hist",
    "convert_hsv",
    "convert_lab",
    "split_merge",
    "bitwise_not",
    "resize",
    "rotate",
    "smooth_bilateral",
    "mask_circle",
    "sobel",
    "laplacian",
    "contours",
];

/// The operation list served to the page and by `/api/operations`
pub fn builtin() -> OperationSet {
    OperationSet::new(vec![
        Operation::new("grayscale", "Grayscale"),
        Operation::new("blur", "Gaussian Blur")
            .with_param(Parameter::int("ksize", "Kernel Size (odd)", 5)),
        Operation::new("canny", "Canny Edge")
            .with_param(Parameter::int("threshold1", "Threshold 1", 100))
            .with_param(Parameter::int("threshold2", "Threshold 2", 200)),
        Operation::new("threshold", "Binary Threshold")
            .with_param(Parameter::int("thresh", "Threshold", 127))
            .with_param(Parameter::int("maxval", "Max Value", 255)),
        Operation::new("equalize_hist", "Histogram Equalization (Gray)"),
        Operation::new("convert_hsv", "Convert to HSV"),
        Operation::new("convert_lab", "Convert to LAB"),
        Operation::new("split_merge", "Split & Merge channels (Swap R/B)"),
        Operation::new("bitwise_not", "Bitwise NOT"),
        Operation::new("resize", "Resize").with_param(Parameter::float("scale", "Scale", 0.5)),
        Operation::new("rotate", "Rotate").with_param(Parameter::float("angle", "Angle (deg)", 90.0)),
        Operation::new("smooth_bilateral", "Bilateral Filter")
            .with_param(Parameter::int("d", "Diameter", 9))
            .with_param(Parameter::int("sigmaColor", "Sigma Color", 75))
            .with_param(Parameter::int("sigmaSpace", "Sigma Space", 75)),
        Operation::new("mask_circle", "Mask Circle"),
        Operation::new("sobel", "Sobel Gradients"),
        Operation::new("laplacian", "Laplacian"),
        Operation::new("contours", "Find & Draw Contours"),
    ])
}
