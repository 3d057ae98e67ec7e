//! Background colours that commonly fill the gaps between webtoon panels.

/// An RGB colour.
pub type Rgb8 = [u8; 3];

/// Preset background swatches, roughly grouped by hue.
///
/// Whites and light greys dominate Korean webtoon gutters; the long grey
/// ramp down to near-black covers night scenes and dark chapters.
pub const WEBTOON_BACKGROUNDS: &[Rgb8] = &[
    // base
    [255, 255, 255],
    [0, 0, 0],
    // light greys
    [252, 252, 252],
    [250, 250, 250],
    [248, 248, 248],
    [245, 245, 245],
    [242, 242, 242],
    [240, 240, 240],
    [238, 238, 238],
    [235, 235, 235],
    [230, 230, 230],
    [225, 225, 225],
    [220, 220, 220],
    [215, 215, 215],
    [210, 210, 210],
    [205, 205, 205],
    [200, 200, 200],
    // cream and beige
    [255, 253, 250],
    [253, 245, 230],
    [250, 240, 230],
    [255, 248, 220],
    [255, 250, 240],
    [245, 245, 220],
    [255, 228, 196],
    // pinks
    [255, 240, 245],
    [255, 228, 225],
    [255, 218, 185],
    [255, 239, 213],
    [255, 235, 205],
    // blues
    [240, 248, 255],
    [230, 230, 250],
    [248, 248, 255],
    // greens and cyans
    [240, 255, 240],
    [245, 255, 250],
    [240, 255, 255],
    // dark greys
    [195, 195, 195],
    [190, 190, 190],
    [185, 185, 185],
    [180, 180, 180],
    [175, 175, 175],
    [170, 170, 170],
    [165, 165, 165],
    [160, 160, 160],
    [155, 155, 155],
    [150, 150, 150],
    [145, 145, 145],
    [140, 140, 140],
    [135, 135, 135],
    [130, 130, 130],
    [125, 125, 125],
    [120, 120, 120],
    [115, 115, 115],
    [110, 110, 110],
    [105, 105, 105],
    [100, 100, 100],
    [95, 95, 95],
    [90, 90, 90],
    [85, 85, 85],
    [80, 80, 80],
    [75, 75, 75],
    [70, 70, 70],
    [65, 65, 65],
    [60, 60, 60],
    [55, 55, 55],
    [50, 50, 50],
    [45, 45, 45],
    [40, 40, 40],
    [35, 35, 35],
    [30, 30, 30],
    [25, 25, 25],
    [20, 20, 20],
    [15, 15, 15],
    [10, 10, 10],
    [5, 5, 5],
];
