use std::fmt::Display;

pub trait ResultExtensions<T, E> {
    /// Prints the error to stderr and discards it, keeping the success value.
    fn report(self) -> Option<T>;
}

impl<T, E: Display> ResultExtensions<T, E> for Result<T, E> {
    fn report(self) -> Option<T> {
        self.inspect_err(|err| {
            eprintln!("{}", err);
        })
        .ok()
    }
}
