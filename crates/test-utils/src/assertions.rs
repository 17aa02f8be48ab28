#![allow(dead_code)]

use termrun::Response;

/// Chainable assertions over a [`Response`] to simplify test bodies.
pub struct ResponseAssert {
    response: Response,
}

impl ResponseAssert {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    pub fn ok(self) -> Self {
        assert!(
            self.response.successful(),
            "expected a successful response, got exit code {:?} with stderr {:?}",
            self.response.exit_code(),
            self.response.error_output()
        );
        self
    }

    pub fn failed(self) -> Self {
        assert!(
            !self.response.successful(),
            "expected a failed response, got a successful one with output {:?}",
            self.response.output()
        );
        self
    }

    pub fn output(self, expected: &str) -> Self {
        assert_eq!(self.response.output(), expected, "unexpected stdout");
        self
    }

    pub fn error_output(self, expected: &str) -> Self {
        assert_eq!(self.response.error_output(), expected, "unexpected stderr");
        self
    }

    pub fn line_count(self, expected: usize) -> Self {
        let lines = self.response.lines();
        assert_eq!(
            lines.len(),
            expected,
            "unexpected number of output lines: {lines:?}"
        );
        self
    }

    pub fn empty(self) -> Self {
        self.line_count(0)
    }

    pub fn into_inner(self) -> Response {
        self.response
    }
}

/// Entry point mirroring the builder style used across the tests.
pub fn assert_response(response: Response) -> ResponseAssert {
    ResponseAssert::new(response)
}
