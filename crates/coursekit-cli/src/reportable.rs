use anyhow::Result;

/// A trait for things that can be output as a document.
///
/// This trait is used to factor output-related code, such as friendly handling of buffering, into
/// one place.
pub trait Reportable {
    type Format;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()>;
}

/// Write a report to the destination given by the output arguments.
///
/// Broken pipes, like those that come from piping to `head`, are not treated as errors.
pub fn write_report<R, F>(reportable: &R, output_args: &crate::args::OutputArgs<F>) -> Result<()>
where
    R: Reportable<Format = F>,
    F: clap::ValueEnum + Send + Sync + Copy + 'static,
{
    use anyhow::Context;

    let writer = output_args
        .get_writer()
        .context("Failed to open output destination for writing")?;

    match reportable.report(output_args.format, writer) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            _ => Err(e),
        },
    }
}
