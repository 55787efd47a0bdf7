use lazy_static::lazy_static;
use serde::Serialize;

#[derive(Serialize, Debug, PartialEq, Eq, Clone)]
pub struct Retcode {
    #[serde(rename = "retcode")]
    ret_code: i32,
    message: String,
}

impl Retcode {
    pub fn with_message(&self, msg: &str) -> Retcode {
        Retcode {
            ret_code: self.ret_code,
            message: format!("{}: {}", self.message, msg),
        }
    }

    pub fn code(&self) -> i32 {
        self.ret_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

lazy_static! {
    pub static ref OK: Retcode = Retcode {
        ret_code: 0,
        message: "ok".to_string(),
    };
    // Request Errors (10000-19999)
    pub static ref REQUEST_ERROR: Retcode = Retcode {
        ret_code: 10000,
        message: "Request Error".to_string(),
    };
    pub static ref BAD_REQUEST: Retcode = Retcode {
        ret_code: 10001,
        message: "Bad Request".to_string(),
    };
    pub static ref UNKNOWN_ACTION: Retcode = Retcode {
        ret_code: 10002,
        message: "Unknown Action".to_string(),
    };
    pub static ref PERMISSION_DENIED: Retcode = Retcode {
        ret_code: 10003,
        message: "Permission Denied".to_string(),
    };
    pub static ref PARAM_ERROR: Retcode = Retcode {
        ret_code: 10006,
        message: "Param Error".to_string(),
    };
    pub static ref AUTH_FAILED: Retcode = Retcode {
        ret_code: 10007,
        message: "Authentication Failed".to_string(),
    };
    pub static ref FORBIDDEN: Retcode = Retcode {
        ret_code: 10008,
        message: "Forbidden".to_string(),
    };
    pub static ref CONFLICT: Retcode = Retcode {
        ret_code: 10009,
        message: "Conflict".to_string(),
    };
    pub static ref NOT_FOUND: Retcode = Retcode {
        ret_code: 10010,
        message: "Not Found".to_string(),
    };

    // Unexpected Error
    pub static ref UNEXPECTED_ERROR: Retcode = Retcode {
        ret_code: 20001,
        message: "Unexpected Error".to_string(),
    };

    // Instance Errors (30000-39999)
    pub static ref INSTANCE_ERROR: Retcode = Retcode {
        ret_code: 30000,
        message: "Instance Error".to_string(),
    };
    pub static ref BAD_INSTANCE_STATE: Retcode = Retcode {
        ret_code: 30003,
        message: "Bad Instance State".to_string(),
    };
    pub static ref NOT_RUNNING: Retcode = Retcode {
        ret_code: 30005,
        message: "Not Running".to_string(),
    };
    pub static ref ALREADY_RUNNING: Retcode = Retcode {
        ret_code: 30006,
        message: "Already Running".to_string(),
    };

    // Instance Action Errors
    pub static ref INSTANCE_ACTION_ERROR: Retcode = Retcode {
        ret_code: 31001,
        message: "Instance Action Error".to_string(),
    };
    pub static ref PROCESS_ERROR: Retcode = Retcode {
        ret_code: 31003,
        message: "Process Error".to_string(),
    };
    pub static ref LAUNCH_ERROR: Retcode = Retcode {
        ret_code: 31004,
        message: "Launch Error".to_string(),
    };
}
