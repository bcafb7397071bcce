use easy_ext::ext;

#[ext(ResultExt)]
pub(crate) impl<T, E> Result<T, E> {
    fn err_into<U>(self) -> Result<T, U>
    where
        E: Into<U>,
    {
        self.map_err(Into::into)
    }
}

/// Renders the error with all of its sources, like `{:#}` does for `anyhow`.
pub(crate) fn chain(err: &dyn std::error::Error) -> String {
    itertools::join(std::iter::successors(Some(err), |err| err.source()), ": ")
}
