use std::io::{self, Write};

use pixmines_stage::Raster;

/// Writes `raster` as a binary PPM. Alpha is dropped.
pub fn write_ppm(raster: &Raster, mut out: impl Write) -> io::Result<()> {
    write!(out, "P6\n{} {}\n255\n", raster.width(), raster.height())?;
    let rgb: Vec<u8> = raster
        .to_rgba()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    out.write_all(&rgb)?;
    out.flush()
}
