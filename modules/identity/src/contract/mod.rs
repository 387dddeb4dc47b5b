pub mod model;

pub use model::{
    CreateUserCommand, ForgotPasswordAck, ForgotPasswordCommand, SearchUserQuery,
    SearchUserResult, UpdatePasswordCommand, UpdateStatusCommand, UpdateUserCommand, User,
    UserStatus,
};
