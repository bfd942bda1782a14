/*!
# FLIR video

Renders the frames of a thermal camera capture session into a false-color
video and a directory of annotated PNG frames.

## Key Components

- [`RecordStore`] - loads the raw frame records of a session
- [`Session`] - records in chronological order with the session raw range
- [`FrameRenderer`] - normalizes, colors and resizes a raw frame
- [`OverlayCompositor`] - temperature scale bar and timestamp overlays
- [`FfmpegVideo`] & [`StillWriter`] - video and frame image outputs
- [`Pipeline`] - the stages above run in sequence

## Usage

```rust,no_run
use flir_video::{Config, Outcome, Pipeline, RecordStore};

let pipeline = Pipeline::new(Config::default().fps(10).output_size(640, 480))?;
let store = RecordStore::new("data_collection/FLIR");
match pipeline.run(&store, "data_collection/FLIR.mp4", "data_collection/FLIR_Frames")? {
    Outcome::NothingToRender => println!("no valid input"),
    Outcome::Rendered { video, summary } => {
        println!("{} frames written to {:?}", summary.n_frame, video)
    }
}
# Ok::<(), flir_video::Error>(())
```
*/

pub mod calibration;
pub mod config;
mod error;
pub mod overlay;
pub mod palette;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod session;
pub mod sink;

pub use calibration::{compute_range, CalibrationMapping, GlobalRange};
pub use config::{Calibration, Config, Subsecond};
pub use error::Error;
pub use overlay::OverlayCompositor;
pub use palette::Palette;
pub use pipeline::{Outcome, Pipeline, Summary};
pub use record::{Frame, Record, RecordStore};
pub use render::FrameRenderer;
pub use session::{order, Session};
pub use sink::{FfmpegVideo, FrameSink, StillWriter};
