use scopekit_auth::Credential;
use scopekit_core::SerialNum;

/// Everything a wrapped handler receives for one request.
///
/// `credential` is the zero value on routes without the credential middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext<T> {
    pub serial_num: SerialNum,
    /// The `Resource` path parameter, if the route declares one.
    pub resource: Option<String>,
    pub credential: Credential,
    pub body: T,
}

impl<T> RequestContext<T> {
    pub fn new(serial_num: SerialNum, body: T) -> Self {
        Self {
            serial_num,
            resource: None,
            credential: Credential::default(),
            body,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        !self.credential.is_anonymous()
    }
}
