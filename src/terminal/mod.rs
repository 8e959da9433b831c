mod bullet_points;

pub use bullet_points::{BulletPointPrinter, LineWriter};

#[cfg(test)]
pub(crate) use bullet_points::RecordingLineWriter;
