//! The `mapper!` macro: typed repository contracts over a dispatcher.

/// Declare a repository contract and its implementation.
///
/// Each method names its statement kind, its parameter type (omitted for
/// statements without one), the row type for SELECTs and optionally an
/// explicit statement id. Without an id the statement whose normalized id
/// matches the method name is used, so `get_employee_by_id` finds
/// `getEmployeeById`.
///
/// SELECT and DELETE methods borrow their parameter; INSERT and UPDATE take it
/// mutably so generated keys can be written back.
///
/// ```ignore
/// sqlmapper::mapper! {
///     pub struct EmployeeMapper: "EmployeeMapper" {
///         select_one get_employee_by_id(id: i64) -> Employee;
///         select_list get_all_employees() -> Employee;
///         select_one count() -> i64 => "countEmployees";
///         insert insert_employee(employee: Employee);
///         delete delete_employee(id: i64);
///     }
/// }
///
/// let mapper: EmployeeMapper = session.get_mapper()?;
/// let employee = mapper.get_employee_by_id(&542).await?;
/// ```
#[macro_export]
macro_rules! mapper {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $namespace:literal {
            $(
                $(#[$fmeta:meta])*
                $kind:ident $method:ident ( $($arg:ident : $argty:ty)? ) $(-> $ret:ty)? $(=> $id:literal)? ;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            dispatcher: $crate::mapper::MapperDispatcher,
        }

        impl $crate::mapper::MapperContract for $name {
            const NAMESPACE: &'static str = $namespace;

            fn methods() -> ::std::vec::Vec<$crate::mapper::MethodSignature> {
                ::std::vec![
                    $(
                        $crate::__mapper_item!(@signature $kind $method ($($argty)?) ($($ret)?) ($($id)?))
                    ),*
                ]
            }

            fn from_dispatcher(dispatcher: $crate::mapper::MapperDispatcher) -> Self {
                Self { dispatcher }
            }
        }

        impl $name {
            $(
                $crate::__mapper_item!(@method [$(#[$fmeta])*] $kind $method ($($arg : $argty)?) ($($ret)?));
            )*
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __mapper_item {
    (@signature select_one $method:ident ($($argty:ty)?) ($ret:ty) ($($id:literal)?)) => {
        $crate::__mapper_item!(@select $method ($($argty)?) ($ret) ($($id)?))
    };
    (@signature select_list $method:ident ($($argty:ty)?) ($ret:ty) ($($id:literal)?)) => {
        $crate::__mapper_item!(@select $method ($($argty)?) ($ret) ($($id)?))
    };
    (@signature insert $method:ident ($($argty:ty)?) () ($($id:literal)?)) => {
        $crate::__mapper_item!(@write Insert $method ($($argty)?) ($($id)?))
    };
    (@signature update $method:ident ($($argty:ty)?) () ($($id:literal)?)) => {
        $crate::__mapper_item!(@write Update $method ($($argty)?) ($($id)?))
    };
    (@signature delete $method:ident ($($argty:ty)?) () ($($id:literal)?)) => {
        $crate::__mapper_item!(@write Delete $method ($($argty)?) ($($id)?))
    };

    (@select $method:ident ($($argty:ty)?) ($ret:ty) ($($id:literal)?)) => {
        $crate::mapper::MethodSignature {
            name: ::std::stringify!($method),
            statement_type: $crate::statement::StatementType::Select,
            statement_id: $crate::__mapper_item!(@id $($id)?),
            parameter_type: $crate::__mapper_item!(@param $($argty)?),
            result_type: ::std::option::Option::Some(<$ret as $crate::binding::FromRow>::row_type()),
        }
    };
    (@write $kind:ident $method:ident ($($argty:ty)?) ($($id:literal)?)) => {
        $crate::mapper::MethodSignature {
            name: ::std::stringify!($method),
            statement_type: $crate::statement::StatementType::$kind,
            statement_id: $crate::__mapper_item!(@id $($id)?),
            parameter_type: $crate::__mapper_item!(@param $($argty)?),
            result_type: ::std::option::Option::None,
        }
    };

    (@id) => { ::std::option::Option::None };
    (@id $id:literal) => { ::std::option::Option::Some($id) };
    (@param) => { ::std::option::Option::None };
    (@param $argty:ty) => { <$argty as $crate::binding::Parameter>::parameter_type() };
    (@arg) => { &() };
    (@arg $arg:ident) => { $arg };
    (@arg_mut) => { &mut () };
    (@arg_mut $arg:ident) => { $arg };

    (@method [$($fmeta:tt)*] select_one $method:ident ($($arg:ident : $argty:ty)?) ($ret:ty)) => {
        $($fmeta)*
        pub async fn $method(&self $(, $arg: &$argty)?) -> $crate::MapperResult<::std::option::Option<$ret>> {
            self.dispatcher
                .select_one(::std::stringify!($method), $crate::__mapper_item!(@arg $($arg)?))
                .await
        }
    };
    (@method [$($fmeta:tt)*] select_list $method:ident ($($arg:ident : $argty:ty)?) ($ret:ty)) => {
        $($fmeta)*
        pub async fn $method(&self $(, $arg: &$argty)?) -> $crate::MapperResult<::std::vec::Vec<$ret>> {
            self.dispatcher
                .select_list(::std::stringify!($method), $crate::__mapper_item!(@arg $($arg)?))
                .await
        }
    };
    (@method [$($fmeta:tt)*] insert $method:ident ($($arg:ident : $argty:ty)?) ()) => {
        $($fmeta)*
        pub async fn $method(&self $(, $arg: &mut $argty)?) -> $crate::MapperResult<$crate::models::WriteResult> {
            self.dispatcher
                .insert(::std::stringify!($method), $crate::__mapper_item!(@arg_mut $($arg)?))
                .await
        }
    };
    (@method [$($fmeta:tt)*] update $method:ident ($($arg:ident : $argty:ty)?) ()) => {
        $($fmeta)*
        pub async fn $method(&self $(, $arg: &mut $argty)?) -> $crate::MapperResult<$crate::models::WriteResult> {
            self.dispatcher
                .update(::std::stringify!($method), $crate::__mapper_item!(@arg_mut $($arg)?))
                .await
        }
    };
    (@method [$($fmeta:tt)*] delete $method:ident ($($arg:ident : $argty:ty)?) ()) => {
        $($fmeta)*
        pub async fn $method(&self $(, $arg: &$argty)?) -> $crate::MapperResult<u64> {
            self.dispatcher
                .delete(::std::stringify!($method), $crate::__mapper_item!(@arg $($arg)?))
                .await
        }
    };
}
